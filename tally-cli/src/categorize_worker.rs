//! Background categorization: requests in, id-keyed events out.
//!
//! Each add dispatches a request here and gets the result back as a store
//! patch keyed by task id, so a task deleted mid-flight simply discards its
//! event. Requests run concurrently and are never cancelled; a request whose
//! event is lost is settled by the caller as `CategoryOutcome::Failed`.

use tokio::sync::mpsc;

use crate::config::GeminiSection;
use crate::gemini;

#[derive(Debug, Clone)]
pub struct CategorizeRequest {
    pub task_id: String,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct CategorizeEvent {
    pub task_id: String,
    pub category: String,
}

pub async fn run_worker(
    mut rx: mpsc::UnboundedReceiver<CategorizeRequest>,
    tx: mpsc::UnboundedSender<CategorizeEvent>,
    cfg: GeminiSection,
) {
    while let Some(req) = rx.recv().await {
        let tx2 = tx.clone();
        let cfg2 = cfg.clone();
        tokio::spawn(async move {
            // categorize never errors: failures already degraded to "General"
            let category = gemini::categorize(&cfg2, &req.text).await;
            let _ = tx2.send(CategorizeEvent {
                task_id: req.task_id,
                category,
            });
        });
    }
}
