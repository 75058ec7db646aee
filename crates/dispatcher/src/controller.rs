use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::scheduler::JobScheduler;

/// 调度控制器
///
/// Drives [`JobScheduler::schedule_ready_jobs`] in the background: on every
/// scan tick and whenever the scheduler signals that new work may be ready.
pub struct SchedulerController {
    scheduler: JobScheduler,
    scan_interval: Duration,
    shutdown_tx: broadcast::Sender<()>,
    handle: Mutex<Option<JoinHandle<()>>>,
    running: AtomicBool,
}

impl SchedulerController {
    pub fn new(scheduler: JobScheduler, scan_interval: Duration) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            scheduler,
            scan_interval,
            shutdown_tx,
            handle: Mutex::new(None),
            running: AtomicBool::new(false),
        }
    }

    pub fn scheduler(&self) -> &JobScheduler {
        &self.scheduler
    }

    /// Spawns the scheduling loop. Calling it on a running controller is a no-op.
    pub fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            debug!("调度控制器已在运行");
            return;
        }

        let scheduler = self.scheduler.clone();
        let interval = self.scan_interval;
        let shutdown_rx = self.shutdown_tx.subscribe();
        let handle = tokio::spawn(async move {
            run_scheduler_loop(scheduler, interval, shutdown_rx).await;
        });

        match self.handle.lock() {
            Ok(mut slot) => *slot = Some(handle),
            Err(poisoned) => *poisoned.into_inner() = Some(handle),
        }
        info!("调度控制器已启动，扫描间隔 {:?}", interval);
    }

    /// Stops the loop and waits for the in-progress pass to finish.
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }

        let _ = self.shutdown_tx.send(());
        let handle = match self.handle.lock() {
            Ok(mut slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!("调度循环异常退出: {}", e);
            }
        }
        info!("调度控制器已停止");
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

/// 运行调度器循环
pub async fn run_scheduler_loop(
    scheduler: JobScheduler,
    scan_interval: Duration,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    let mut interval = tokio::time::interval(scan_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => {
                info!("调度器循环收到关闭信号");
                break;
            }
            _ = interval.tick() => {}
            _ = scheduler.wait_for_work() => {}
        }

        match scheduler.schedule_ready_jobs().await {
            Ok(_) => {}
            Err(e) if e.is_retryable() => warn!("本轮调度未完成，下一轮重试: {}", e),
            Err(e) => error!("作业调度失败: {}", e),
        }
    }
}
