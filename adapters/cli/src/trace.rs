//! Recorded position traces replayed through the movement feed.

use std::{collections::VecDeque, fs, path::Path};

use anyhow::{bail, Context, Result};
use geotoken_core::LatLng;
use geotoken_system_movement::{FeedError, PositionFeed};

/// Parses `lat,lng` lines. Blank lines and lines starting with `#` are skipped.
pub fn parse_trace(contents: &str) -> Result<Vec<LatLng>> {
    let mut samples = Vec::new();
    for (index, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let (lat, lng) = line
            .split_once(',')
            .with_context(|| format!("line {}: expected `lat,lng`", index + 1))?;
        let lat: f64 = lat
            .trim()
            .parse()
            .with_context(|| format!("line {}: invalid latitude `{lat}`", index + 1))?;
        let lng: f64 = lng
            .trim()
            .parse()
            .with_context(|| format!("line {}: invalid longitude `{lng}`", index + 1))?;
        if !lat.is_finite() || !lng.is_finite() {
            bail!("line {}: position must be finite", index + 1);
        }
        samples.push(LatLng::new(lat, lng));
    }
    Ok(samples)
}

/// Reads a trace file from disk.
pub fn read_trace(path: &Path) -> Result<Vec<LatLng>> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read trace at {}", path.display()))?;
    parse_trace(&contents).with_context(|| format!("invalid trace in {}", path.display()))
}

/// Position feed replaying queued samples.
#[derive(Debug, Default)]
pub struct TraceFeed {
    queued: VecDeque<LatLng>,
    subscribed: bool,
}

impl TraceFeed {
    /// Creates a feed with nothing queued.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends samples to replay.
    pub fn queue(&mut self, samples: impl IntoIterator<Item = LatLng>) {
        self.queued.extend(samples);
    }
}

impl PositionFeed for TraceFeed {
    fn subscribe(&mut self) -> Result<(), FeedError> {
        if self.queued.is_empty() {
            return Err(FeedError::Unavailable);
        }
        self.subscribed = true;
        Ok(())
    }

    fn unsubscribe(&mut self) {
        self.subscribed = false;
    }

    fn next_sample(&mut self) -> Option<Result<LatLng, FeedError>> {
        if !self.subscribed {
            return None;
        }
        self.queued.pop_front().map(Ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_samples_and_skips_comments() {
        let samples = parse_trace("# walk\n36.98, -122.06\n\n36.99,-122.05\n").expect("valid trace");
        assert_eq!(
            samples,
            vec![LatLng::new(36.98, -122.06), LatLng::new(36.99, -122.05)]
        );
    }

    #[test]
    fn reports_the_offending_line() {
        let error = parse_trace("1.0,2.0\nnorth").expect_err("second line is invalid");
        assert!(format!("{error:#}").contains("line 2"));
        assert!(parse_trace("NaN,1.0").is_err());
    }

    #[test]
    fn empty_feed_refuses_to_subscribe() {
        let mut feed = TraceFeed::new();
        assert_eq!(feed.subscribe(), Err(FeedError::Unavailable));

        feed.queue([LatLng::new(0.0, 0.0)]);
        feed.subscribe().expect("samples queued");
        assert!(matches!(feed.next_sample(), Some(Ok(_))));
        assert!(feed.next_sample().is_none());
    }
}
