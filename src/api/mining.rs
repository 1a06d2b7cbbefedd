use actix_web::{HttpResponse, Responder, delete, get, post, rt, web};
use log::{debug, info, warn};
use std::collections::HashMap;
use std::time::Instant;
use uuid::Uuid;

use super::models::{AppState, JobResponse, JobStatus, MiningJob};
use crate::blockchain::{Block, CancelToken, miner};
use crate::error::MiningError;

/// Finished jobs kept around for polling; older ones are evicted.
const MAX_FINISHED_JOBS: usize = 64;

/// Start mining the next block in the background. The chain lock is only
/// held to snapshot the tip and to append the sealed block.
#[post("/mining/jobs/")]
pub async fn start_job(state: web::Data<AppState>) -> impl Responder {
    let block = {
        let bc = state.blockchain.lock().expect("mutex poisoned");
        bc.next_block()
    };

    let job = MiningJob {
        job_id: Uuid::new_v4().to_string(),
        index: block.index,
        bits: block.bits,
        status: JobStatus::Running,
        cancel: CancelToken::new(),
        finished_at: None,
    };
    let resp = JobResponse::from(&job);
    {
        let mut jobs = state.mining_jobs.lock().expect("mutex poisoned");
        jobs.insert(job.job_id.clone(), job.clone());
    }
    info!(
        "MINING - job {} started for block #{} (bits={:#010x})",
        job.job_id, job.index, job.bits
    );

    rt::spawn(run_job(state, job.job_id, block, job.cancel));

    HttpResponse::Accepted().json(resp)
}

async fn run_job(state: web::Data<AppState>, job_id: String, block: Block, cancel: CancelToken) {
    let index = block.index;
    let mined = web::block(move || miner::mine(block, &cancel)).await;

    let status = match mined {
        Err(e) => JobStatus::Failed {
            reason: e.to_string(),
        },
        Ok(Err(MiningError::Cancelled { attempts })) => JobStatus::Cancelled { attempts },
        Ok(Err(e)) => JobStatus::Failed {
            reason: e.to_string(),
        },
        Ok(Ok(sealed)) => {
            let mut bc = state.blockchain.lock().expect("mutex poisoned");
            let nonce = sealed.nonce;
            match bc.append(sealed) {
                Ok(appended) => JobStatus::Sealed {
                    hash: appended.hash.clone().unwrap_or_default(),
                    nonce,
                },
                Err(e) => {
                    warn!("MINING - job {} discarded: {}", job_id, e);
                    JobStatus::Failed {
                        reason: e.to_string(),
                    }
                }
            }
        }
    };

    debug!("MINING - job {} finished: {:?}", job_id, status);
    let mut jobs = state.mining_jobs.lock().expect("mutex poisoned");
    if matches!(status, JobStatus::Sealed { .. }) {
        cancel_stale(&mut jobs, &job_id, index);
    }
    if let Some(job) = jobs.get_mut(&job_id) {
        job.status = status;
        job.finished_at = Some(Instant::now());
    }
    prune_finished(&mut jobs, MAX_FINISHED_JOBS);
}

/// Stop every other running job whose block height is already taken.
pub(super) fn cancel_stale(jobs: &mut HashMap<String, MiningJob>, sealed_by: &str, index: u64) {
    for job in jobs.values() {
        if job.job_id != sealed_by && job.status == JobStatus::Running && job.index <= index {
            debug!("MINING - job {} superseded by block #{}", job.job_id, index);
            job.cancel.cancel();
        }
    }
}

/// Keep at most `keep` finished jobs, dropping the oldest first.
fn prune_finished(jobs: &mut HashMap<String, MiningJob>, keep: usize) {
    let mut finished: Vec<(Instant, String)> = jobs
        .values()
        .filter_map(|job| job.finished_at.map(|at| (at, job.job_id.clone())))
        .collect();
    if finished.len() <= keep {
        return;
    }
    finished.sort();
    let evict = finished.len() - keep;
    for (_, id) in finished.into_iter().take(evict) {
        jobs.remove(&id);
    }
}

#[get("/mining/jobs/{id}/")]
pub async fn get_job(state: web::Data<AppState>, path: web::Path<(String,)>) -> impl Responder {
    let id = path.into_inner().0;
    let jobs = state.mining_jobs.lock().expect("mutex poisoned");
    match jobs.get(&id) {
        Some(job) => HttpResponse::Ok().json(JobResponse::from(job)),
        None => HttpResponse::NotFound().body("unknown mining job"),
    }
}

/// Request cancellation; the search stops at its next poll.
#[delete("/mining/jobs/{id}/")]
pub async fn cancel_job(state: web::Data<AppState>, path: web::Path<(String,)>) -> impl Responder {
    let id = path.into_inner().0;
    let jobs = state.mining_jobs.lock().expect("mutex poisoned");
    let Some(job) = jobs.get(&id) else {
        return HttpResponse::NotFound().body("unknown mining job");
    };
    if job.status != JobStatus::Running {
        return HttpResponse::Conflict().body("mining job already finished");
    }
    job.cancel.cancel();
    info!("MINING - job {} cancellation requested", id);
    HttpResponse::Accepted().json(JobResponse::from(job))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn job(id: &str, index: u64, status: JobStatus, finished_at: Option<Instant>) -> MiningJob {
        MiningJob {
            job_id: id.to_string(),
            index,
            bits: 0x207F_FFFF,
            status,
            cancel: CancelToken::new(),
            finished_at,
        }
    }

    #[test]
    fn sealing_cancels_jobs_on_the_same_height() {
        let mut jobs: HashMap<String, MiningJob> = [
            job("winner", 1, JobStatus::Running, None),
            job("sibling", 1, JobStatus::Running, None),
            job("ahead", 2, JobStatus::Running, None),
        ]
        .into_iter()
        .map(|j| (j.job_id.clone(), j))
        .collect();

        cancel_stale(&mut jobs, "winner", 1);
        assert!(!jobs["winner"].cancel.is_cancelled());
        assert!(jobs["sibling"].cancel.is_cancelled());
        assert!(!jobs["ahead"].cancel.is_cancelled());
    }

    #[test]
    fn only_the_newest_finished_jobs_are_kept() {
        let start = Instant::now();
        let mut jobs: HashMap<String, MiningJob> = (0..5u64)
            .map(|i| {
                let at = start + Duration::from_millis(i);
                job(&format!("done-{i}"), i, JobStatus::Cancelled { attempts: i }, Some(at))
            })
            .chain([job("running", 9, JobStatus::Running, None)])
            .map(|j| (j.job_id.clone(), j))
            .collect();

        prune_finished(&mut jobs, 2);
        let mut left: Vec<&str> = jobs.keys().map(String::as_str).collect();
        left.sort();
        assert_eq!(left, vec!["done-3", "done-4", "running"]);
    }
}
