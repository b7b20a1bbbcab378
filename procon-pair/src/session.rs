use std::time::Duration;

use bytes::Bytes;
use color_eyre::eyre::{Context, Result};
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use procon_protocol::{Dump, Engine, Report};
use rand::Rng;
use tokio::time::{interval, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Idle report rate while the console is still pairing.
pub const PAIRING_RATE_HZ: u32 = 15;
/// Idle report rate once pairing completed.
pub const CONNECTED_RATE_HZ: u32 = 132;

const STATUS_INTERVAL: u64 = 30;

/// What a single [`Session::step`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Inbound,
    Idle,
    Closed,
    Cancelled,
}

fn ticker(rate_hz: u32) -> Interval {
    let mut ticker = interval(Duration::from_secs(1) / rate_hz);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ticker
}

/// One host connection: the engine plus the cadence it is driven at.
pub struct Session<R> {
    engine: Engine<R>,
    ticker: Interval,
    paired: bool,
    reports_sent: u64,
}

impl<R: Rng> Session<R> {
    /// Must be called from within a tokio runtime.
    pub fn new(engine: Engine<R>) -> Self {
        Self {
            engine,
            ticker: ticker(PAIRING_RATE_HZ),
            paired: false,
            reports_sent: 0,
        }
    }

    pub fn engine(&self) -> &Engine<R> {
        &self.engine
    }

    pub fn is_paired(&self) -> bool {
        self.paired
    }

    pub fn reports_sent(&self) -> u64 {
        self.reports_sent
    }

    pub async fn run<S>(&mut self, token: &CancellationToken, link: &mut S) -> Result<()>
    where
        S: Stream<Item = std::result::Result<Bytes, std::io::Error>>
            + Sink<Report, Error = std::io::Error>
            + Unpin,
    {
        info!("Waiting for the console (Controllers > Change Grip/Order)");

        loop {
            match self.step(token, link).await? {
                Step::Inbound | Step::Idle => {}
                Step::Closed | Step::Cancelled => return Ok(()),
            }
        }
    }

    /// Waits for the next inbound frame or idle tick and answers it with at
    /// most one report.
    pub async fn step<S>(&mut self, token: &CancellationToken, link: &mut S) -> Result<Step>
    where
        S: Stream<Item = std::result::Result<Bytes, std::io::Error>>
            + Sink<Report, Error = std::io::Error>
            + Unpin,
    {
        tokio::select! {
            biased;

            _ = token.cancelled() => {
                debug!("Cancellation token received, shutting down");
                Ok(Step::Cancelled)
            }
            frame = link.next() => {
                let Some(frame) = frame else {
                    info!("Link closed by the host");
                    return Ok(Step::Closed);
                };
                let frame = frame.with_context(|| "Failed reading frame from host")?;
                debug!("{}", Dump::rx(&frame));

                self.engine.on_tick(Some(&frame[..]));
                self.send(link).await?;
                self.check_paired();

                Ok(Step::Inbound)
            }
            _ = self.ticker.tick() => {
                self.idle(link).await?;
                Ok(Step::Idle)
            }
        }
    }

    async fn idle<S>(&mut self, link: &mut S) -> Result<()>
    where
        S: Sink<Report, Error = std::io::Error> + Unpin,
    {
        if self.paired && !self.engine.state().device_info_queried {
            return Ok(());
        }

        self.engine.on_tick(None);
        self.send(link).await?;

        if !self.paired {
            if self.reports_sent % STATUS_INTERVAL == 0 {
                info!("Still waiting for pairing ({} reports sent)", self.reports_sent);
            }
            self.check_paired();
        }

        Ok(())
    }

    async fn send<S>(&mut self, link: &mut S) -> Result<()>
    where
        S: Sink<Report, Error = std::io::Error> + Unpin,
    {
        let report = self.engine.outgoing_report();
        debug!("{}", Dump::tx(report.as_bytes()));

        link.send(report)
            .await
            .with_context(|| "Failed sending report to host")?;
        self.reports_sent += 1;

        Ok(())
    }

    fn check_paired(&mut self) {
        if self.paired || !self.engine.is_pairing_complete() {
            return;
        }

        let state = self.engine.state();
        info!(
            "Paired as player {} (vibration {}, {} reports exchanged), reporting at {} Hz",
            state.player_number.unwrap_or_default(),
            if state.vibration_enabled { "enabled" } else { "disabled" },
            self.reports_sent,
            CONNECTED_RATE_HZ
        );

        self.paired = true;
        self.ticker = ticker(CONNECTED_RATE_HZ);
    }
}
