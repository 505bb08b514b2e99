use std::time::{Duration, Instant};
use tracing::info;

/// Logs the wall time of a scrape command, and the average per game, when
/// the command's scope ends.
pub struct RunTimer {
    label: String,
    games: usize,
    start: Instant,
}

impl RunTimer {
    pub fn start(label: impl Into<String>, games: usize) -> Self {
        let label = label.into();
        info!("⏱  Starting: {} ({} games)", label, games);
        Self {
            label,
            games,
            start: Instant::now(),
        }
    }
}

fn per_game(elapsed: Duration, games: usize) -> Option<Duration> {
    u32::try_from(games).ok().filter(|n| *n > 0).map(|n| elapsed / n)
}

impl Drop for RunTimer {
    fn drop(&mut self) {
        let elapsed = self.start.elapsed();
        match per_game(elapsed, self.games) {
            Some(avg) => info!("⏱  Finished: {} in {:.2?} ({:.2?} per game)", self.label, elapsed, avg),
            None => info!("⏱  Finished: {} in {:.2?}", self.label, elapsed),
        }
    }
}

/// Row and game counts in the summary tables, e.g. `26,240`.
pub fn fmt_count(n: i64) -> String {
    let digits = n.unsigned_abs().to_string();
    let groups: Vec<&str> = digits
        .as_bytes()
        .rchunks(3)
        .rev()
        .map(|g| std::str::from_utf8(g).unwrap_or_default())
        .collect();
    let sign = if n < 0 { "-" } else { "" };
    format!("{}{}", sign, groups.join(","))
}
