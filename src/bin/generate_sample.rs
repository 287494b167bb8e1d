use std::fs::File;
use std::io::BufWriter;

use anyhow::{Context, Result};
use serde_json::{json, Value};

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
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
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

    /// Uniform drift in `[-spread, spread]`.
    fn drift(&mut self, spread: f64) -> f64 {
        (self.next_f64() * 2.0 - 1.0) * spread
    }
}

fn slug(name: &str) -> String {
    name.to_ascii_lowercase()
        .replace(',', "")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
}

fn main() -> Result<()> {
    let mut rng = SimpleRng::new(42);

    // (county id suffix, name, base population)
    let counties = [
        ("01071", "Jackson County, AL", 52_000.0),
        ("01073", "Jefferson County, AL", 660_000.0),
        ("01075", "Lamar County, AL", 14_000.0),
        ("01077", "Lauderdale County, AL", 93_000.0),
        ("01079", "Lawrence County, AL", 33_000.0),
        ("01081", "Lee County, AL", 170_000.0),
    ];
    let years = [2018, 2019, 2020, 2021];

    let mut data: Vec<Value> = Vec::new();
    for &year in &years {
        for &(id, name, base) in &counties {
            // up to ±3% per year around the base
            let population = (base * (1.0 + rng.drift(0.03))).round() as i64;
            data.push(json!({
                "ID County": format!("05000US{id}"),
                "County": name,
                "ID Year": year,
                "Year": year.to_string(),
                "Population": population,
                "Slug County": slug(name),
            }));
        }
    }

    let payload = json!({
        "data": data,
        "source": [{
            "name": "synthetic",
            "description": "Generated by generate_sample; not real census figures."
        }],
    });

    let output_path = "sample_counties.json";
    let file = File::create(output_path).context("creating output file")?;
    serde_json::to_writer_pretty(BufWriter::new(file), &payload).context("writing payload")?;

    println!(
        "Wrote {} county records ({} years) to {output_path}",
        counties.len() * years.len(),
        years.len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugs_match_payload_style() {
        assert_eq!(slug("Jackson County, AL"), "jackson-county-al");
    }

    #[test]
    fn drift_stays_in_range() {
        let mut rng = SimpleRng::new(7);
        for _ in 0..1000 {
            let d = rng.drift(0.03);
            assert!((-0.03..=0.03).contains(&d));
        }
    }
}
