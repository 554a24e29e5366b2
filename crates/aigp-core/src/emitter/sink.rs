//! Downstream receivers of emitted governance records.
//!
//! Sinks return `anyhow::Result` so any transport error can be reported.
//! The emitter logs and counts failures but never propagates them.

use crate::event::GovernanceEvent;
use crate::lineage::GovernanceRunFacet;

/// Receives every governance event (the governance store leg).
#[cfg_attr(test, mockall::automock)]
pub trait EventSink: Send + Sync {
    fn send(&self, event: &GovernanceEvent) -> anyhow::Result<()>;
}

/// Receives the lineage run facet of every governance event.
#[cfg_attr(test, mockall::automock)]
pub trait LineageSink: Send + Sync {
    fn send(&self, facet: &GovernanceRunFacet) -> anyhow::Result<()>;
}

impl<F> EventSink for F
where
    F: Fn(&GovernanceEvent) -> anyhow::Result<()> + Send + Sync,
{
    fn send(&self, event: &GovernanceEvent) -> anyhow::Result<()> {
        self(event)
    }
}

impl<F> LineageSink for F
where
    F: Fn(&GovernanceRunFacet) -> anyhow::Result<()> + Send + Sync,
{
    fn send(&self, facet: &GovernanceRunFacet) -> anyhow::Result<()> {
        self(facet)
    }
}

/// Event sink that writes one JSON line per event to a writer.
pub struct JsonLinesSink<W> {
    writer: std::sync::Mutex<W>,
}

impl<W: std::io::Write + Send> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: std::sync::Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<W: std::io::Write + Send> EventSink for JsonLinesSink<W> {
    fn send(&self, event: &GovernanceEvent) -> anyhow::Result<()> {
        let line = serde_json::to_string(event)?;
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| anyhow::anyhow!("JSON lines writer poisoned"))?;
        writeln!(writer, "{line}")?;
        writer.flush()?;
        Ok(())
    }
}
