use std::error::Error;
use std::time::Instant;

use chrono::NaiveDate;
use gtfs_structures::{Gtfs, GtfsReader};
use log::info;

use csa::timetable::Stations;
use csa::{csa_profile, journeys, CachedTimeTable, Network, NetworkConfig, TimeTable};

const USAGE: &str = "Usage: csa-query <gtfs path> <YYYY-MM-DD> <origin station> <destination station>";

fn load_gtfs(path: String) -> Result<Gtfs, Box<dyn Error>> {
    // On large networks GTFS parsing can overflow the stack, so parse on a thread with a bigger one.
    const GTFS_STACK_SIZE: usize = 64 * 1024 * 1024;
    let gtfs = std::thread::Builder::new()
        .stack_size(GTFS_STACK_SIZE)
        .spawn(move || GtfsReader::default().read_shapes(false).read(&path))?
        .join()
        .map_err(|_| "GTFS loading thread panicked.")??;
    Ok(gtfs)
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    let [_, gtfs_path, date, origin, destination] = args.as_slice() else {
        return Err(USAGE.into());
    };
    let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")?;

    let gtfs = load_gtfs(gtfs_path.clone())?;
    info!("GTFS loaded with {} stops, {} routes and {} trips.", gtfs.stops.len(), gtfs.routes.len(), gtfs.trips.len());
    let network = CachedTimeTable::new(Network::from_gtfs(&gtfs, &[date], &NetworkConfig::default())?);
    drop(gtfs);

    let find = |name: &str| network.stations().find(name).ok_or_else(|| csa::Error::StationNotFound(name.to_owned()));
    let origin = find(origin)?;
    let destination = find(destination)?;

    let start = Instant::now();
    let profile = csa_profile(&network, date, destination)?;
    let journeys = journeys(&profile, origin)?;
    info!("Found {} journeys in {:?}.", journeys.len(), start.elapsed());

    if journeys.is_empty() {
        println!("No journey found.");
    }
    for journey in &journeys {
        println!("{journey}");
    }
    Ok(())
}
