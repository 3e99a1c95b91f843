use anyhow::Result;
use chrono::NaiveDate;
use clap::Parser;

use feishu_calendar::{FreeBusyClient, FreeBusyResolver, FreeSlotQuery};
use feishu_core::SchedulingConfig;

/// Find common free time in Feishu calendars.
///
/// Without arguments, checks that the configured app credentials work.
#[derive(Debug, Parser)]
#[command(name = "feishu-assistant", version)]
struct Cli {
    /// Day to search, YYYY-MM-DD
    #[arg(requires = "user_ids")]
    date: Option<NaiveDate>,

    /// Open IDs of everyone who must attend
    user_ids: Vec<String>,

    /// First hour of the search window (0-23)
    #[arg(long, value_name = "HOUR")]
    start_hour: Option<u32>,

    /// Hour the search window ends (0-23)
    #[arg(long, value_name = "HOUR")]
    end_hour: Option<u32>,

    /// Minimum slot length in minutes
    #[arg(short, long, value_name = "MINUTES")]
    duration: Option<u32>,
}

impl Cli {
    /// Query for `date`, with command line options overriding configured defaults.
    fn query(&self, date: NaiveDate, scheduling: &SchedulingConfig) -> Result<FreeSlotQuery> {
        let base = FreeSlotQuery::from_config(scheduling, self.user_ids.clone(), date)?;
        let start_hour = self.start_hour.unwrap_or(base.start_hour);
        let end_hour = self.end_hour.unwrap_or(base.end_hour);
        let duration = self.duration.unwrap_or(base.min_duration_minutes);

        let query = base
            .with_window(start_hour, end_hour)
            .with_min_duration(duration);
        query.validate()?;
        Ok(query)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    feishu_core::init()?;

    let (config, _validation) = feishu_core::Config::load_validated()?;
    tracing::info!("Config directory: {}", config.config_dir.display());

    let client = FreeBusyClient::from_config(&config)?;

    let Some(date) = cli.date else {
        if client.tokens().verify().await {
            println!("Credentials for {} are valid.", config.feishu.app_id);
            return Ok(());
        }
        anyhow::bail!("Could not obtain a tenant access token; check app_id and app_secret");
    };

    let query = cli.query(date, &config.scheduling)?;

    let resolver = FreeBusyResolver::new(client);
    let slots = match resolver.find_free_slots(&query).await {
        Ok(slots) => slots,
        Err(e) => {
            tracing::error!("Free slot search failed: {}", e);
            anyhow::bail!(e.user_message());
        }
    };

    println!("{}", serde_json::to_string_pretty(&slots)?);
    Ok(())
}
