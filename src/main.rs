use std::io::Write;

use anyhow::{Context, Result};
use county_census::{Counties, Settings};

fn main() -> Result<()> {
    env_logger::init();

    let settings = Settings::load().context("reading COUNTIES_* settings")?;
    let counties = Counties::from_settings(&settings);

    // Per-year summary goes to the log, matching records to stdout.
    if let Some(years) = counties.years_in_dataset() {
        for year in &years {
            if let Some(average) = counties.average_population_per_year(year) {
                log::info!("year {year}: average population {average:.1}");
            }
        }
    }

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let mut written = 0usize;
    for record in counties.close_to_average(settings.closeness) {
        serde_json::to_writer(&mut out, record).context("writing record")?;
        writeln!(out).context("writing record")?;
        written += 1;
    }

    log::info!(
        "{written} records within {} of their year's average",
        settings.closeness
    );
    Ok(())
}
