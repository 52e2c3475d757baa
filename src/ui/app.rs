use log::{debug, info};
use std::time::Duration;
use thiserror::Error;

use crate::analysis::aggregator::Aggregator;
use crate::capture::listener::Listener;
use crate::ui::terminal::{RenderBackend, RenderError};
use crate::utils::shutdown::CancellationToken;
use crate::visualization::presenter::{DisplayModel, Presenter};

pub const DEFAULT_TICK: Duration = Duration::from_millis(100);

#[derive(Error, Debug)]
pub enum DashboardError {
    #[error("rendering backend failed: {0}")]
    Render(#[from] RenderError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Running,
    Stopped,
}

/// The refresh loop: drain the listener, ingest, present, render, idle.
///
/// Owns the listener socket and the rendering backend; both are released
/// when the dashboard drops, whether `run` returned normally or with an error.
pub struct Dashboard<R: RenderBackend> {
    listener: Listener,
    aggregator: Aggregator,
    presenter: Presenter,
    renderer: R,
    token: CancellationToken,
    tick_interval: Duration,
    state: LoopState,
    ticks: u64,
    footer: String,
}

impl<R: RenderBackend> Dashboard<R> {
    pub fn new(
        listener: Listener,
        aggregator: Aggregator,
        presenter: Presenter,
        renderer: R,
        token: CancellationToken,
    ) -> Self {
        let footer = match listener.local_addr() {
            Ok(addr) => format!("Running on {} | Press q or Ctrl+C to exit", addr),
            Err(_) => "Press q or Ctrl+C to exit".to_string(),
        };

        Self {
            listener,
            aggregator,
            presenter,
            renderer,
            token,
            tick_interval: DEFAULT_TICK,
            state: LoopState::Running,
            ticks: 0,
            footer,
        }
    }

    pub fn with_tick_interval(mut self, tick_interval: Duration) -> Self {
        self.tick_interval = tick_interval;
        self
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn aggregator(&self) -> &Aggregator {
        &self.aggregator
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// One drain -> ingest -> present -> render pass. Returns the model that was rendered.
    pub fn tick(&mut self) -> Result<DisplayModel, DashboardError> {
        let packets = self.listener.drain_descriptors();
        if !packets.is_empty() {
            debug!("Ingesting {} packet records", packets.len());
        }
        for packet in packets {
            self.aggregator.ingest(packet);
        }

        let snapshot = self.aggregator.snapshot(self.presenter.top_talkers());
        let mut model = self.presenter.present(&snapshot);
        let stats = self.listener.stats();
        model.footer = if stats.malformed_dropped > 0 {
            format!("{} | {} malformed records dropped", self.footer, stats.malformed_dropped)
        } else {
            self.footer.clone()
        };

        self.renderer.render(&model)?;
        self.ticks += 1;
        Ok(model)
    }

    /// Runs until the cancellation token fires. Renderer failures stop the loop and are returned.
    pub fn run(&mut self) -> Result<(), DashboardError> {
        info!("Dashboard loop started ({} ms tick)", self.tick_interval.as_millis());
        let result = self.run_while(|_| true);
        info!("Dashboard loop stopped after {} ticks", self.ticks);
        result
    }

    /// Like [`run`](Self::run) but stops after at most `max_ticks` ticks.
    pub fn run_for_ticks(&mut self, max_ticks: u64) -> Result<(), DashboardError> {
        let start = self.ticks;
        self.run_while(|ticks| ticks - start < max_ticks)
    }

    fn run_while(&mut self, mut keep_going: impl FnMut(u64) -> bool) -> Result<(), DashboardError> {
        self.state = LoopState::Running;

        while self.state == LoopState::Running {
            if !keep_going(self.ticks) {
                break;
            }
            let step = self
                .tick()
                .and_then(|_| self.renderer.idle(self.tick_interval).map_err(DashboardError::from));
            if let Err(e) = step {
                self.state = LoopState::Stopped;
                return Err(e);
            }
            if self.token.is_cancelled() {
                self.state = LoopState::Stopped;
            }
        }

        Ok(())
    }
}
