use actix_web::{HttpResponse, Responder, get, web};

use super::models::{AppState, JobStatus, StatsResponse};

#[get("/stats/")]
pub async fn get_stats(state: web::Data<AppState>) -> impl Responder {
    let (height, bits, difficulty, target, window, last_interval, avg_interval) = {
        let bc = state.blockchain.lock().expect("mutex poisoned");
        let height = bc.len();
        let window = bc.retarget_window();

        let last_interval = if height >= 2 {
            bc.average_block_time(height - 2, height - 1)
        } else {
            None
        };
        // average over the most recent full window
        let avg_interval = if height > window {
            bc.average_block_time(height - 1 - window, height - 1)
        } else {
            None
        };

        (
            height,
            bc.bits(),
            bc.difficulty().ok(),
            bc.target_block_time().as_secs_f64(),
            window,
            last_interval,
            avg_interval,
        )
    };

    let running_jobs = {
        let jobs = state.mining_jobs.lock().expect("mutex poisoned");
        jobs.values()
            .filter(|job| job.status == JobStatus::Running)
            .count()
    };
    let (ledger_height, pending_size) = {
        let ledger = state.ledger.lock().expect("mutex poisoned");
        (ledger.len(), ledger.pending().len())
    };

    HttpResponse::Ok().json(StatsResponse {
        height,
        bits,
        difficulty,
        target_block_time_secs: target,
        retarget_window: window,
        last_interval_secs: last_interval,
        avg_interval_secs: avg_interval,
        running_jobs,
        ledger_height,
        pending_size,
    })
}
