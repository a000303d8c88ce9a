//! Writes a deterministic sample dataset into a directory (default `data/`):
//! `reviews.csv`, `provider_agg.csv`, `top_features.txt` and
//! `confusion_matrix.csv`.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate};
use log::info;
use review_dash::stats::tally::positive_rate_percent;
use review_dash::text::flags::flag_string;

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5)).rotate_left(7).wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn below(&mut self, n: usize) -> usize {
        (self.next_f64() * n as f64) as usize % n.max(1)
    }

    fn pick<'a>(&mut self, items: &[&'a str]) -> &'a str {
        items[self.below(items.len())]
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

/// (title, probability a review is positive)
const GAMES: &[(&str, f64)] = &[
    ("Hollow Depths", 0.82),
    ("Star Freight", 0.55),
    ("Pixel Farm", 0.71),
    ("Night Circuit", 0.34),
];

const POSITIVE: &[&str] = &[
    "Amazing art and a great soundtrack",
    "I love the combat, excellent pacing",
    "Awesome co-op, hours of fun with friends",
    "great value",
];
const NEUTRAL: &[&str] = &[
    "It is fine, nothing special but playable",
    "Decent game, could use more content",
];
const NEGATIVE: &[&str] = &[
    "Boring after an hour and the UI is bad",
    "CONSTANT CRASHES AND LAG, REFUND",
    "Terrible bug on save, lost my progress",
    "bad",
    "Get free keys at https://spam.example",
];

fn main() -> Result<()> {
    env_logger::init();
    let dir = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("data"));
    fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;

    let mut rng = SimpleRng::new(42);
    let counts = write_reviews(&dir.join("reviews.csv"), &mut rng, 400)?;
    write_provider_agg(&dir.join("provider_agg.csv"), &counts, &mut rng)?;
    write_top_features(&dir.join("top_features.txt"))?;
    write_confusion(&dir.join("confusion_matrix.csv"))?;
    info!("Sample data written to {}", dir.display());
    Ok(())
}

#[derive(Default)]
struct Counts {
    positive: usize,
    neutral: usize,
    negative: usize,
}

fn write_reviews(path: &Path, rng: &mut SimpleRng, n: usize) -> Result<BTreeMap<&'static str, Counts>> {
    let mut writer = csv::Writer::from_path(path).with_context(|| format!("creating {}", path.display()))?;
    writer.write_record([
        "id", "game", "text", "sentiment", "helpful", "funny", "playtime", "timestamp", "flag",
    ])?;

    let start = NaiveDate::from_ymd_opt(2024, 1, 1).context("invalid start date")?;
    let mut counts: BTreeMap<&'static str, Counts> = BTreeMap::new();
    for id in 0..n {
        let (game, p_positive) = GAMES[rng.below(GAMES.len())];
        let roll = rng.next_f64();
        let (sentiment, text) = if roll < p_positive {
            ("positive", rng.pick(POSITIVE))
        } else if roll < p_positive + (1.0 - p_positive) * 0.3 {
            ("neutral", rng.pick(NEUTRAL))
        } else {
            ("negative", rng.pick(NEGATIVE))
        };
        let entry = counts.entry(game).or_default();
        match sentiment {
            "positive" => entry.positive += 1,
            "neutral" => entry.neutral += 1,
            _ => entry.negative += 1,
        }

        let playtime = rng.gauss(if sentiment == "positive" { 40.0 } else { 12.0 }, 8.0).max(0.1);
        let helpful = (playtime / 4.0 + rng.gauss(0.0, 2.0)).max(0.0).round();
        let funny = rng.below(5);
        let when = start + Duration::days(rng.below(270) as i64);
        // A few blanks so consumers see missing values.
        let helpful = if id % 37 == 0 { String::new() } else { helpful.to_string() };

        writer.write_record([
            id.to_string(),
            game.to_string(),
            text.to_string(),
            sentiment.to_string(),
            helpful,
            funny.to_string(),
            format!("{playtime:.1}"),
            when.format("%Y-%m-%d").to_string(),
            flag_string(text),
        ])?;
    }
    writer.flush()?;
    Ok(counts)
}

fn write_provider_agg(path: &Path, counts: &BTreeMap<&'static str, Counts>, rng: &mut SimpleRng) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).with_context(|| format!("creating {}", path.display()))?;
    writer.write_record([
        "game", "total_reviews", "positive", "neutral", "negative", "positive_rate", "avg_playtime",
    ])?;
    for (game, c) in counts {
        let total = c.positive + c.neutral + c.negative;
        let rate = f64::from(positive_rate_percent(c.positive, total)) / 100.0;
        writer.write_record([
            game.to_string(),
            total.to_string(),
            c.positive.to_string(),
            c.neutral.to_string(),
            c.negative.to_string(),
            format!("{rate:.2}"),
            format!("{:.1}", rng.gauss(25.0, 5.0)),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn write_top_features(path: &Path) -> Result<()> {
    let report = "\
Top positive features:
great,0.91
love,0.84
excellent\t0.66
1) soundtrack (0.41)
Top negative features:
refund: -0.88
crash -0.75
boring,-0.52
lag,-0.49
";
    fs::write(path, report).with_context(|| format!("writing {}", path.display()))
}

fn write_confusion(path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).with_context(|| format!("creating {}", path.display()))?;
    writer.write_record(["412", "38"])?;
    writer.write_record(["51", "399"])?;
    writer.flush()?;
    Ok(())
}
