use anyhow::Result;
use tracing::{debug, info, warn};

use flight_replay::app::App;
use flight_replay::config::parse_args;
use flight_replay::logging::init as init_logging;
use flight_replay::runtime::{init_terminal, restore_terminal, run_app};
use flight_replay::storage::load_inputs;

fn main() -> Result<()> {
    let config = parse_args()?;
    let _log_guard = init_logging(&config);
    info!("flight-replay starting");
    debug!("config path: {}", config.config_path.display());

    let dataset = load_inputs(&config.data_file, &config.display_file)?;
    let app = App::new(dataset, &config);

    let mut terminal = init_terminal()?;
    let res = run_app(&mut terminal, app);
    restore_terminal(&mut terminal)?;

    if let Err(err) = res {
        warn!("runtime error: {err}");
        eprintln!("{err}");
    }

    info!("flight-replay exited");
    Ok(())
}
