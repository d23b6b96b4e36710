use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use anyhow::Context;
use clap::Subcommand;
use lume_node::config::DEFAULT_STORE_DIR;
use toml_edit::{DocumentMut, Item, Table};
use tracing::info;

use crate::helpers::write_new_secret_key;

#[derive(Subcommand)]
pub enum CmdConfig {
    /// Creates the config file if it doesn't exist and generates a node key
    Init,
}

impl CmdConfig {
    pub fn run(self, config_file: PathBuf) -> anyhow::Result<()> {
        let config_dir = lume_node::config::config_dir(&config_file).to_path_buf();
        let mut doc = if config_file.exists() {
            fs::read_to_string(&config_file)?
        } else {
            fs::create_dir_all(&config_dir)?;
            "".to_owned()
        }
        .parse::<DocumentMut>()
        .context("could not parse config file")?;

        match self {
            Self::Init => {
                let secret_key_file = config_file.with_extension("secretkey");
                let secret_key_name = secret_key_file
                    .file_name()
                    .and_then(|name| name.to_str())
                    .context("config file name is not valid UTF-8")?
                    .to_owned();

                table_mut(&mut doc, "identity")?
                    .entry("secret_key_file")
                    .or_insert(secret_key_name.into());

                let store = table_mut(&mut doc, "store")?;
                store
                    .entry("type")
                    .or_insert(lume_node::config::DEFAULT_BACKEND.into());
                store.entry("path").or_insert(DEFAULT_STORE_DIR.into());

                let registry = table_mut(&mut doc, "registry")?;
                registry.entry("key_format").or_insert("raw".into());

                if !secret_key_file.exists() {
                    info!("generating secure random secret key for node");
                    write_new_secret_key(&secret_key_file)?;
                }
            }
        }

        info!("writing to config file {config_file:?}");
        write_atomic(&config_file, doc.to_string().as_bytes())
    }
}

fn table_mut<'a>(doc: &'a mut DocumentMut, name: &str) -> anyhow::Result<&'a mut Table> {
    doc.entry(name)
        .or_insert(Item::Table(Table::new()))
        .as_table_mut()
        .with_context(|| format!("`{name}` in config file is not a table"))
}

fn write_atomic(path: &Path, contents: &[u8]) -> anyhow::Result<()> {
    let tmp_path = path.with_extension("tmp");
    let mut tmp = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&tmp_path)?;
    tmp.write_all(contents)?;
    tmp.sync_all()?;
    fs::rename(&tmp_path, path)?;
    Ok(())
}
