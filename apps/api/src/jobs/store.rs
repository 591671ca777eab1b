//! In-memory job registry with time-based expiry.
//!
//! Jobs are short-lived, single-session artifacts: nothing here survives a
//! restart. An expired job is treated as absent by every lookup and is
//! removed either on that lookup or by the periodic sweep.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::outreach::models::{Insights, StructuredResult};

/// How long a job stays addressable after creation.
pub const JOB_TTL_MINUTES: i64 = 60;

/// One outreach-generation request and its cached output.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: Uuid,
    pub resume_text: String,
    pub jd_text: String,
    pub company_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub cached_result: Option<StructuredResult>,
    /// Mirrors `cached_result.insights`; lets regenerate skip the full result.
    pub cached_insights: Option<Insights>,
}

impl Job {
    fn is_expired_at(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now - self.created_at > ttl
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStoreStats {
    pub size: usize,
    pub oldest_created_at: Option<DateTime<Utc>>,
}

/// Shared, clonable handle to the job map.
#[derive(Debug, Clone)]
pub struct JobStore {
    jobs: Arc<Mutex<HashMap<Uuid, Job>>>,
    ttl: Duration,
}

impl Default for JobStore {
    fn default() -> Self {
        Self::new()
    }
}

impl JobStore {
    pub fn new() -> Self {
        Self::with_ttl(Duration::minutes(JOB_TTL_MINUTES))
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            jobs: Arc::new(Mutex::new(HashMap::new())),
            ttl,
        }
    }

    /// Every operation leaves the map consistent, so a panic elsewhere while
    /// holding the lock does not invalidate it.
    fn lock(&self) -> MutexGuard<'_, HashMap<Uuid, Job>> {
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn create_job(
        &self,
        resume_text: String,
        jd_text: String,
        company_name: Option<String>,
    ) -> Job {
        self.create_job_at(resume_text, jd_text, company_name, Utc::now())
    }

    fn create_job_at(
        &self,
        resume_text: String,
        jd_text: String,
        company_name: Option<String>,
        now: DateTime<Utc>,
    ) -> Job {
        let mut jobs = self.lock();
        let mut id = Uuid::new_v4();
        while jobs.contains_key(&id) {
            id = Uuid::new_v4();
        }

        let job = Job {
            id,
            resume_text,
            jd_text,
            company_name,
            created_at: now,
            cached_result: None,
            cached_insights: None,
        };
        jobs.insert(id, job.clone());
        job
    }

    /// Returns a snapshot of the job, or `None` if unknown or expired.
    pub fn get_job(&self, id: Uuid) -> Option<Job> {
        self.get_job_at(id, Utc::now())
    }

    fn get_job_at(&self, id: Uuid, now: DateTime<Utc>) -> Option<Job> {
        let mut jobs = self.lock();
        let expired = jobs.get(&id)?.is_expired_at(now, self.ttl);
        if expired {
            jobs.remove(&id);
            return None;
        }
        jobs.get(&id).cloned()
    }

    /// Caches a completed result. Absent jobs are ignored.
    pub fn attach_result(&self, id: Uuid, result: StructuredResult) {
        if let Some(job) = self.lock().get_mut(&id) {
            job.cached_insights = Some(result.insights.clone());
            job.cached_result = Some(result);
        }
    }

    /// Insights from the last completed generation, if the job is still live.
    pub fn get_cached_insights(&self, id: Uuid) -> Option<Insights> {
        self.get_job(id)?.cached_insights
    }

    /// Evicts every expired job and returns how many were removed.
    pub fn sweep_expired(&self) -> usize {
        self.sweep_expired_at(Utc::now())
    }

    fn sweep_expired_at(&self, now: DateTime<Utc>) -> usize {
        let mut jobs = self.lock();
        let before = jobs.len();
        jobs.retain(|_, job| !job.is_expired_at(now, self.ttl));
        before - jobs.len()
    }

    pub fn stats(&self) -> JobStoreStats {
        let jobs = self.lock();
        JobStoreStats {
            size: jobs.len(),
            oldest_created_at: jobs.values().map(|job| job.created_at).min(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    use crate::outreach::models::{EmailDraft, ResultMetadata};

    fn result(body: &str) -> StructuredResult {
        StructuredResult {
            insights: Insights {
                fit_reasons: vec!["a".to_string()],
                company_insights: vec!["b".to_string()],
                unique_angle: "c".to_string(),
                curiosity_question: "d?".to_string(),
            },
            email: EmailDraft {
                subject: "s".to_string(),
                body: body.to_string(),
            },
            metadata: ResultMetadata {
                company_name: "Acme".to_string(),
                role_title: "Senior".to_string(),
                word_count: 1,
            },
        }
    }

    fn job(store: &JobStore, at: DateTime<Utc>) -> Job {
        store.create_job_at("resume".to_string(), "jd".to_string(), None, at)
    }

    #[test]
    fn test_create_then_get() {
        let store = JobStore::new();
        let created = store.create_job(
            "Experienced engineer...".to_string(),
            "Senior role at Acme...".to_string(),
            Some("Acme".to_string()),
        );

        let fetched = store.get_job(created.id).unwrap();
        assert_eq!(fetched.resume_text, "Experienced engineer...");
        assert_eq!(fetched.jd_text, "Senior role at Acme...");
        assert_eq!(fetched.company_name.as_deref(), Some("Acme"));
        assert!(fetched.cached_result.is_none());
    }

    #[test]
    fn test_unknown_id_is_not_found() {
        let store = JobStore::new();
        assert!(store.get_job(Uuid::new_v4()).is_none());
        assert!(store.get_cached_insights(Uuid::new_v4()).is_none());
    }

    #[test]
    fn test_job_expires_after_ttl() {
        let store = JobStore::new();
        let created_at = Utc::now();
        let job = job(&store, created_at);

        let at_ttl = created_at + Duration::minutes(JOB_TTL_MINUTES);
        assert!(store.get_job_at(job.id, at_ttl).is_some());

        let past_ttl = at_ttl + Duration::milliseconds(1);
        assert!(store.get_job_at(job.id, past_ttl).is_none());
        // repeated lookups stay not-found
        assert!(store.get_job_at(job.id, past_ttl).is_none());
        assert!(store.get_job(job.id).is_none());
        assert_eq!(store.stats().size, 0);
    }

    #[test]
    fn test_sweep_removes_exactly_expired_jobs() {
        let store = JobStore::new();
        let now = Utc::now();
        let old_a = job(&store, now - Duration::minutes(90));
        let old_b = job(&store, now - Duration::minutes(61));
        let fresh = job(&store, now - Duration::minutes(59));
        let brand_new = job(&store, now);

        assert_eq!(store.sweep_expired_at(now), 2);
        assert!(store.get_job_at(old_a.id, now).is_none());
        assert!(store.get_job_at(old_b.id, now).is_none());
        assert!(store.get_job_at(fresh.id, now).is_some());
        assert!(store.get_job_at(brand_new.id, now).is_some());

        assert_eq!(store.sweep_expired_at(now), 0);
    }

    #[test]
    fn test_cached_insights_only_after_attach() {
        let store = JobStore::new();
        let job = job(&store, Utc::now());
        assert!(store.get_cached_insights(job.id).is_none());

        let attached = result("first");
        store.attach_result(job.id, attached.clone());
        assert_eq!(store.get_cached_insights(job.id), Some(attached.insights));

        let regenerated = result("second");
        store.attach_result(job.id, regenerated);
        let cached = store.get_job(job.id).unwrap().cached_result.unwrap();
        assert_eq!(cached.email.body, "second");
    }

    #[test]
    fn test_attach_to_missing_job_is_a_noop() {
        let store = JobStore::new();
        store.attach_result(Uuid::new_v4(), result("x"));
        assert_eq!(store.stats().size, 0);
    }

    #[test]
    fn test_expired_job_hides_cached_insights() {
        let store = JobStore::with_ttl(Duration::zero());
        let job = job(&store, Utc::now() - Duration::seconds(1));
        store.attach_result(job.id, result("x"));
        assert!(store.get_cached_insights(job.id).is_none());
    }

    #[test]
    fn test_stats_reports_oldest() {
        let store = JobStore::new();
        assert_eq!(
            store.stats(),
            JobStoreStats {
                size: 0,
                oldest_created_at: None
            }
        );

        let now = Utc::now();
        job(&store, now);
        let oldest = job(&store, now - Duration::minutes(5));
        let stats = store.stats();
        assert_eq!(stats.size, 2);
        assert_eq!(stats.oldest_created_at, Some(oldest.created_at));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_creates_yield_unique_ids() {
        let store = JobStore::new();
        let handles: Vec<_> = (0..64)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move {
                    let job = store.create_job(format!("resume {i}"), "jd".to_string(), None);
                    store.sweep_expired();
                    job.id
                })
            })
            .collect();

        let mut ids = HashSet::new();
        for handle in handles {
            ids.insert(handle.await.unwrap());
        }
        assert_eq!(ids.len(), 64);
        assert_eq!(store.stats().size, 64);
    }
}
