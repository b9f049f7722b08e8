// Worker pool scheduler - Bounded concurrent panel renders, results kept in panel order
use crate::application::panel_renderer::{PanelRenderer, RenderContext};
use crate::domain::dashboard::Panel;
use crate::domain::render::{Backend, RenderError, RenderResult};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// One slot pool per backend. Browser tabs are memory bound and render calls are
/// network bound, so each gets its own ceiling.
#[derive(Debug, Clone)]
pub struct WorkerPools {
    browser: Arc<Semaphore>,
    render: Arc<Semaphore>,
}

impl WorkerPools {
    pub fn new(max_browser_workers: usize, max_render_workers: usize) -> Self {
        Self {
            browser: Arc::new(Semaphore::new(max_browser_workers.max(1))),
            render: Arc::new(Semaphore::new(max_render_workers.max(1))),
        }
    }

    fn pool_for(&self, backend: Backend) -> Arc<Semaphore> {
        match backend {
            Backend::NativeBrowser => self.browser.clone(),
            Backend::ImageService => self.render.clone(),
        }
    }
}

pub struct Scheduler {
    renderer: PanelRenderer,
    pools: WorkerPools,
}

impl Scheduler {
    pub fn new(renderer: PanelRenderer, pools: WorkerPools) -> Self {
        Self { renderer, pools }
    }

    /// Render every panel and return one result per panel, in input order.
    ///
    /// Dropping the returned future aborts in-flight renders and frees their slots.
    pub async fn run(&self, ctx: Arc<RenderContext>, panels: Vec<Panel>) -> Vec<RenderResult> {
        let backend = ctx.backend();
        let mut tasks = JoinSet::new();
        let mut task_slots = HashMap::new();

        for (slot, panel) in panels.iter().cloned().enumerate() {
            let pool = self.pools.pool_for(backend);
            let renderer = self.renderer.clone();
            let ctx = ctx.clone();

            let handle = tasks.spawn(async move {
                let result = match pool.acquire_owned().await {
                    Ok(_permit) => renderer.render_panel(&ctx, &panel).await,
                    Err(e) => RenderResult::failed(panel.id.clone(), RenderError::Aborted(e.to_string()), 0),
                };
                (slot, result)
            });
            task_slots.insert(handle.id(), slot);
        }

        let mut slots: Vec<Option<RenderResult>> = panels.iter().map(|_| None).collect();
        while let Some(joined) = tasks.join_next_with_id().await {
            match joined {
                Ok((_, (slot, result))) => slots[slot] = Some(result),
                Err(err) => {
                    if let Some(&slot) = task_slots.get(&err.id()) {
                        tracing::error!(panel_id = %panels[slot].id, "Render task failed: {}", err);
                        slots[slot] = Some(RenderResult::failed(
                            panels[slot].id.clone(),
                            RenderError::Aborted(err.to_string()),
                            0,
                        ));
                    }
                }
            }
        }

        slots
            .into_iter()
            .zip(panels)
            .map(|(result, panel)| {
                result.unwrap_or_else(|| {
                    RenderResult::failed(panel.id, RenderError::Aborted("no result recorded".to_string()), 0)
                })
            })
            .collect()
    }
}
