//! Runtime configuration: addresses, ports, NCP tuning, and the topology
//! file loader (spec §6, §10.3).
//!
//! Grounded on `original_source/.../ncp.c`'s `load_topology_config()` for
//! the topology grammar; spec.md §6 for which parameters are configuration
//! rather than protocol.

use std::fs;
use std::net::SocketAddr;
use std::path::Path;

use crate::error::ConfigError;
use crate::ncp::connection::NcpConfig;

const SECTION_SENTINEL: &str = "# SECTION 1: IMP NETWORK TOPOLOGY";
const MAX_IMP_NAME_LEN: usize = 31;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImpTopologyEntry {
    pub number: u8,
    pub name: String,
}

/// Parses a topology file: everything before `# SECTION 1: IMP NETWORK
/// TOPOLOGY` is ignored; inside the section, `IMP <number> #<name>` lines
/// are collected; anything else inside or outside the section is ignored.
pub fn load_topology(path: impl AsRef<Path>) -> Result<Vec<ImpTopologyEntry>, ConfigError> {
    let text = fs::read_to_string(path)?;
    parse_topology(&text)
}

fn parse_topology(text: &str) -> Result<Vec<ImpTopologyEntry>, ConfigError> {
    let mut entries = Vec::new();
    let mut in_section = false;
    for line in text.lines() {
        let line = line.trim_end();
        if line.trim() == SECTION_SENTINEL {
            in_section = true;
            continue;
        }
        if !in_section {
            continue;
        }
        let Some(rest) = line.strip_prefix("IMP ") else {
            continue;
        };
        let Some((number_str, name_part)) = rest.split_once('#') else {
            continue;
        };
        let number: u8 = number_str
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidImpNumber(number_str.trim().to_string()))?;
        if number > 63 {
            return Err(ConfigError::InvalidImpNumber(number_str.trim().to_string()));
        }
        let name = name_part.trim().to_string();
        if name.len() > MAX_IMP_NAME_LEN {
            return Err(ConfigError::NameTooLong(name));
        }
        entries.push(ImpTopologyEntry { number, name });
    }
    Ok(entries)
}

/// Socket addresses and sockets this host process binds or dials, plus NCP
/// tuning — the caller-supplied parameters spec §6 places out of protocol
/// scope.
#[derive(Debug, Clone)]
pub struct Config {
    pub imp_local_addr: SocketAddr,
    pub imp_peer_addr: SocketAddr,
    pub console_addr: Option<SocketAddr>,
    pub ncp: NcpConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_imp_lines_inside_section() {
        let text = "preamble\n# SECTION 1: IMP NETWORK TOPOLOGY\nIMP 3 #ucla\nnonsense\nIMP 11 #bbn\n";
        let entries = parse_topology(text).unwrap();
        assert_eq!(
            entries,
            vec![
                ImpTopologyEntry { number: 3, name: "ucla".into() },
                ImpTopologyEntry { number: 11, name: "bbn".into() },
            ]
        );
    }

    #[test]
    fn ignores_lines_before_section() {
        let text = "IMP 3 #ucla\n# SECTION 1: IMP NETWORK TOPOLOGY\nIMP 5 #sri\n";
        let entries = parse_topology(text).unwrap();
        assert_eq!(entries, vec![ImpTopologyEntry { number: 5, name: "sri".into() }]);
    }

    #[test]
    fn rejects_out_of_range_imp_number() {
        let text = "# SECTION 1: IMP NETWORK TOPOLOGY\nIMP 99 #bogus\n";
        assert!(parse_topology(text).is_err());
    }

    #[test]
    fn rejects_overlong_name() {
        let long_name = "x".repeat(40);
        let text = format!("# SECTION 1: IMP NETWORK TOPOLOGY\nIMP 1 #{long_name}\n");
        assert!(parse_topology(&text).is_err());
    }
}
