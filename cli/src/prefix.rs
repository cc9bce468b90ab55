use reloc::PrefixMap;

#[derive(thiserror::Error, Debug)]
pub enum PrefixPairError {
    #[error("Expected OLD=NEW, got {0:?}")]
    NoSeparator(String),
    #[error("Old prefix is empty in {0:?}")]
    EmptyOld(String),
}

#[derive(clap::Args)]
pub struct PrefixArgs {
    /// Replace prefix OLD with NEW; the first matching pair wins.
    #[clap(
        short = 'p',
        long = "prefix",
        value_name = "OLD=NEW",
        value_parser = parse_prefix_pair,
        required = true
    )]
    prefixes: Vec<(String, String)>,
}

impl PrefixArgs {
    pub fn prefix_map(&self) -> PrefixMap {
        PrefixMap::from_strings_or_bytes(self.prefixes.iter().map(|(old, new)| (old, new)))
    }
}

pub(crate) fn parse_prefix_pair(s: &str) -> Result<(String, String), PrefixPairError> {
    let (old, new) = s
        .split_once('=')
        .ok_or_else(|| PrefixPairError::NoSeparator(s.into()))?;
    if old.is_empty() {
        return Err(PrefixPairError::EmptyOld(s.into()));
    }
    Ok((old.into(), new.into()))
}
