//! Loading airport data files into the [`AtcManager`].

use std::borrow::Cow;
use std::collections::HashSet;
use std::io;

use bevy::ecs::system::Command as BevyCommand;
use bevy::ecs::world::World;
use bevy::log::info;
use strum::IntoEnumIterator;

use crate::controller::ControllerKind;
use crate::dynamics::{Airport, AirportDynamics};
use crate::ground;
use crate::manager::{self, AtcManager, StationRef};
use crate::Conf;

#[cfg(test)]
mod tests;

#[derive(derive_more::From)]
pub enum Source {
    /// CBOR-encoded [`store::File`].
    Raw(Cow<'static, [u8]>),
    Parsed(Box<store::File>),
}

/// Loads every airport of a file and staffs all four stations of each.
///
/// Nothing is loaded if any airport of the file is invalid.
pub struct Command {
    pub source:   Source,
    pub on_error: Box<dyn FnOnce(&mut World, Error) + Send>,
}

impl BevyCommand for Command {
    fn apply(self, world: &mut World) {
        if let Err(err) = do_load(world, &self.source) {
            (self.on_error)(world, err);
        }
    }
}

fn do_load(world: &mut World, source: &Source) -> Result<(), Error> {
    let file_owned: store::File;
    let file = match source {
        Source::Raw(bytes) => {
            file_owned = ciborium::from_reader(bytes.as_ref()).map_err(Error::Serde)?;
            &file_owned
        }
        Source::Parsed(file) => file,
    };

    let conf = world.resource::<Conf>().clone();
    let airports = build_airports(world.resource::<AtcManager>(), file, &conf)?;

    let mut manager = world.resource_mut::<AtcManager>();
    for airport in airports {
        let code = airport.code.clone();
        manager.add_airport(AirportDynamics::new(airport))?;
        for kind in ControllerKind::iter() {
            manager.add_controller(StationRef { airport: code.clone(), kind });
        }
    }

    info!("Loaded {} airports", file.airports.len());
    Ok(())
}

fn build_airports(manager: &AtcManager, file: &store::File, conf: &Conf) -> Result<Vec<Airport>> {
    let mut seen = HashSet::new();
    file.airports
        .iter()
        .map(|airport| {
            if !seen.insert(airport.code.as_str()) || manager.airport(&airport.code).is_some() {
                return Err(Error::DuplicateAirport(airport.code.clone()));
            }
            check_preferences(airport)?;
            Airport::build(airport, conf)
                .map_err(|source| Error::Ground { airport: airport.code.clone(), source })
        })
        .collect()
}

fn check_preferences(airport: &store::Airport) -> Result<()> {
    let names = airport
        .runway_preference
        .iter()
        .flat_map(|preference| preference.departure.iter().chain(&preference.arrival));
    for name in names {
        if !airport.runways.iter().any(|runway| runway.name == *name) {
            return Err(Error::UnresolvedRunway { airport: airport.code.clone(), runway: name.clone() });
        }
    }
    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Deserialization error: {0}")]
    Serde(ciborium::de::Error<io::Error>),
    #[error("Airport {0:?} is defined more than once")]
    DuplicateAirport(String),
    #[error("No runway called {runway:?} in airport {airport:?}")]
    UnresolvedRunway { airport: String, runway: String },
    #[error("Ground network of airport {airport:?}: {source}")]
    Ground {
        airport: String,
        #[source]
        source:  ground::BuildError,
    },
    #[error(transparent)]
    Manager(#[from] manager::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
