//! Binary persistence of networks.
//!
//! A saved network is the magic bytes `NGEN` followed by a bincode payload
//! holding the topology (as layer specs) and the genome. Loading replays the
//! specs onto an empty network and installs the genome.

use crate::error::{Error, Result};
use crate::layers::LayerSpec;
use crate::loss::LossFunction;
use crate::network::Network;

use log::debug;
use serde_derive::{Deserialize, Serialize};
use std::convert::TryFrom;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

const MAGIC: &[u8; 4] = b"NGEN";

/// Current file format version
pub const FORMAT_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct SavedNetwork {
    version: u32,
    loss: u8,
    learning_rate: f64,
    layers: Vec<LayerSpec>,
    genome: Vec<f64>,
}

impl Network {
    /// Encodes the network's topology and parameters.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let saved = SavedNetwork {
            version: FORMAT_VERSION,
            loss: self.loss_function().tag(),
            learning_rate: self.learning_rate(),
            layers: self.specs(),
            genome: self.get_genome(),
        };
        let mut bytes = MAGIC.to_vec();
        bincode::serialize_into(&mut bytes, &saved)?;
        Ok(bytes)
    }

    /// Rebuilds a network encoded by `to_bytes`.
    pub fn from_bytes(bytes: &[u8]) -> Result<Network> {
        if bytes.len() < MAGIC.len() || &bytes[..MAGIC.len()] != MAGIC {
            return Err(Error::InvalidFormat("missing magic bytes".to_string()));
        }
        let saved: SavedNetwork = bincode::deserialize(&bytes[MAGIC.len()..])?;
        if saved.version != FORMAT_VERSION {
            return Err(Error::VersionMismatch {
                expected: FORMAT_VERSION,
                found: saved.version,
            });
        }
        let loss = LossFunction::try_from(saved.loss)?;
        let mut network = Network::from_specs(loss, saved.learning_rate, saved.layers)?;
        network.set_genome(&saved.genome)?;
        Ok(network)
    }

    /// Writes the network to `path`.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        debug!("Writing network to {}", path.as_ref().display());
        let mut writer = BufWriter::new(File::create(path)?);
        writer.write_all(&self.to_bytes()?)?;
        writer.flush()?;
        Ok(())
    }

    /// Reads a network written by `save`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Network> {
        debug!("Reading network from {}", path.as_ref().display());
        let mut reader = BufReader::new(File::open(path)?);
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        Network::from_bytes(&bytes)
    }
}
