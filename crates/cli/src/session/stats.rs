//! Session statistics.

use std::time::Duration;

use ingestion::MetricsSnapshot;
use observability::PublishSummary;
use serde::Serialize;
use sync_engine::SyncStats;

use super::StopReason;

/// Statistics from a session
#[derive(Debug, Clone)]
pub struct SessionStats {
    /// Why the session ended
    pub reason: StopReason,

    /// Wall time from start to stop
    pub duration: Duration,

    /// Synchronizer counters
    pub sync: SyncStats,

    /// Depth listener counters
    pub depth: MetricsSnapshot,

    /// Color listener counters
    pub color: MetricsSnapshot,

    /// What the reader saw
    pub reader: PublishSummary,
}

/// JSON-friendly view of the headline numbers
#[derive(Debug, Serialize)]
pub struct SessionReport {
    pub reason: StopReason,
    pub duration_secs: f64,
    pub pairs_per_second: f64,
    pub drop_rate_percent: f64,
    pub sync: SyncStats,
}

impl SessionStats {
    /// Published pairs per second
    pub fn pairs_per_second(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.sync.pairs_published as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Share of received frames that never made it into a published pair
    pub fn drop_rate(&self) -> f64 {
        let received = self.depth.frames_received + self.color.frames_received;
        if received == 0 {
            return 0.0;
        }
        let published_frames = self.sync.pairs_published * 2;
        let lost = received.saturating_sub(published_frames);
        (lost as f64 / received as f64) * 100.0
    }

    pub fn report(&self) -> SessionReport {
        SessionReport {
            reason: self.reason,
            duration_secs: self.duration.as_secs_f64(),
            pairs_per_second: self.pairs_per_second(),
            drop_rate_percent: self.drop_rate(),
            sync: self.sync,
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                     Session Statistics                       ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("📊 Overview");
        println!("   ├─ Stopped by: {}", self.reason);
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Pairs published: {}", self.sync.pairs_published);
        println!("   ├─ Pairs/s: {:.2}", self.pairs_per_second());
        match self.sync.last_published_index {
            Some(index) => println!("   └─ Last index: {}", index),
            None => println!("   └─ Last index: N/A"),
        }

        println!("\n📥 Streams");
        for (name, snapshot) in [("depth", &self.depth), ("color", &self.color)] {
            println!(
                "   ├─ {}: received={}, dropped={}, fetch failures={}",
                name, snapshot.frames_received, snapshot.frames_dropped, snapshot.fetch_failures
            );
        }
        println!("   └─ Drop rate: {:.2}%", self.drop_rate());

        println!("\n📈 Synchronizer");
        println!("   ├─ Depth discarded: {}", self.sync.depth_dropped);
        println!("   ├─ Color discarded: {}", self.sync.color_dropped);
        println!("   ├─ Out of order: {}", self.sync.out_of_order);
        println!("   └─ Rejected pairs: {}", self.sync.rejected_pairs);

        println!("\n{}", self.reader);
    }
}
