//! Solidity interface sources derived from the registry ABIs
//!
//! One file is written per interface. It starts with a commented declaration for every
//! deployment of the interface, e.g.
//!
//! ```text
//! // IERC20 usdc = IERC20(0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48);
//! // IERC20 usdt = IERC20(0xdAC17F958D2ee523a2206206994597C13D831ec7);
//! ```
//!
//! followed by the interface body rendered from the group's ABI.

use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use alloy::{json_abi::JsonAbi, primitives::Address};

use crate::{
    abi::{AbiSource, resolve_group_abi},
    error::{LoaderError, Result},
    registry::{DeploymentRecord, Registry},
};

/// Default extension of generated interface files
pub const SOURCE_EXTENSION: &str = "sol";

const LEGACY_PRAGMA: &str = "pragma solidity ^0.5.0";
const PRAGMA: &str = "pragma solidity ^0.6.0";
const LEGACY_FALLBACK: &str = "function () external payable;";
const FALLBACK: &str = "fallback () external payable;";
/// Floor of the syntax printed by `JsonAbi::to_sol`
const SOL_PRAGMA: &str = "pragma solidity ^0.8.0";

/// Renders an ABI as interface source text.
pub trait InterfaceSourceGenerator {
    fn generate(&self, abi: &JsonAbi, interface_name: &str) -> String;
}

impl<G: InterfaceSourceGenerator + ?Sized> InterfaceSourceGenerator for &G {
    fn generate(&self, abi: &JsonAbi, interface_name: &str) -> String {
        (**self).generate(abi, interface_name)
    }
}

/// Solidity interface rendered by alloy's ABI printer.
#[derive(Debug, Clone, Copy, Default)]
pub struct SolInterfaceGenerator;

impl InterfaceSourceGenerator for SolInterfaceGenerator {
    fn generate(&self, abi: &JsonAbi, interface_name: &str) -> String {
        format!(
            "// SPDX-License-Identifier: UNLICENSED\n{SOL_PRAGMA};\n\n{}\n",
            abi.to_sol(interface_name, None)
        )
    }
}

/// Lift the compiler floor to 0.6 and rewrite legacy anonymous fallbacks, everywhere in `source`.
pub fn normalize_interface_source(source: &str) -> String {
    source
        .replace(LEGACY_PRAGMA, PRAGMA)
        .replace(LEGACY_FALLBACK, FALLBACK)
}

/// Commented declaration of one deployment, newline terminated.
pub fn deployment_header(interface_name: &str, key: &str, address: &Address) -> String {
    format!(
        "// {interface_name} {key} = {interface_name}({});\n",
        address.to_checksum(None)
    )
}

fn invalid_address(record: &DeploymentRecord) -> LoaderError {
    LoaderError::InvalidAddress {
        key: record.key.clone(),
        addr: record.address.clone(),
    }
}

/// Hex digits of a `0x` literal, at most 20 bytes worth.
fn hex_digits(record: &DeploymentRecord) -> Result<&str> {
    let addr = record.address.trim();
    let digits = addr
        .strip_prefix("0x")
        .or_else(|| addr.strip_prefix("0X"))
        .ok_or_else(|| invalid_address(record))?;
    if digits.is_empty() || digits.len() > 40 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(invalid_address(record));
    }
    Ok(digits)
}

/// Parse a registry address for binding: `0x` and exactly 40 hex digits. Checksums are not
/// enforced.
pub fn parse_address(record: &DeploymentRecord) -> Result<Address> {
    let digits = hex_digits(record)?;
    if digits.len() != 40 {
        return Err(invalid_address(record));
    }
    Address::from_str(digits).map_err(|_| invalid_address(record))
}

/// Address shown in a header line. Short literals such as `0x1` are left-padded to 20 bytes
/// here only; binding rejects them.
pub fn header_address(record: &DeploymentRecord) -> Result<Address> {
    let digits = hex_digits(record)?;
    Address::from_str(&format!("{digits:0>40}")).map_err(|_| invalid_address(record))
}

/// Write `{out_dir}/{interface}.{extension}` for every interface in the registry, in first-seen
/// order. Stops at the first failing group; files already written are kept.
pub fn write_interfaces<S, G>(
    registry: &Registry,
    abi_source: &S,
    generator: &G,
    out_dir: &Path,
    extension: &str,
) -> Result<Vec<PathBuf>>
where
    S: AbiSource + ?Sized,
    G: InterfaceSourceGenerator + ?Sized,
{
    let mut written = Vec::new();
    for group in registry.groups() {
        let mut source = String::new();
        for deployment in &group.deployments {
            let address = header_address(deployment)?;
            source.push_str(&deployment_header(
                group.interface_name,
                &deployment.key,
                &address,
            ));
        }

        let resolved = resolve_group_abi(
            abi_source,
            group.interface_name,
            group.deployments.iter().copied(),
        )?;
        let body = generator.generate(&resolved.abi, group.interface_name);
        source.push_str(&normalize_interface_source(&body));

        let path = out_dir.join(format!("{}.{extension}", group.interface_name));
        fs::write(&path, source).map_err(|source| LoaderError::OutputWrite {
            path: path.clone(),
            source,
        })?;
        tracing::info!(
            interface = group.interface_name,
            deployments = group.deployments.len(),
            abi = %resolved.source_key,
            path = %path.display(),
            "wrote interface source"
        );
        written.push(path);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        abi::tests::{ERC20_ABI, MemAbiSource, WETH_ABI},
        registry::record,
    };
    use alloy::primitives::address;
    use tempfile::TempDir;

    /// Mimics generators that still emit 0.5-era syntax.
    struct LegacyGenerator;

    impl InterfaceSourceGenerator for LegacyGenerator {
        fn generate(&self, _abi: &JsonAbi, interface_name: &str) -> String {
            format!(
                "pragma solidity ^0.5.0;\n\ninterface {interface_name} {{\n    \
                 function () external payable;\n    function () external payable;\n}}\n"
            )
        }
    }

    #[test]
    fn test_normalize_rewrites_every_occurrence() {
        let body = "pragma solidity ^0.5.0;\npragma solidity ^0.5.0;\n\
                    function () external payable;\nfunction () external payable;\n";
        let normalized = normalize_interface_source(body);
        assert_eq!(normalized.matches("pragma solidity ^0.6.0").count(), 2);
        assert_eq!(normalized.matches("fallback () external payable;").count(), 2);
        assert!(!normalized.contains("^0.5.0"));
        assert!(!normalized.contains("function () external"));
    }

    #[test]
    fn test_deployment_header_is_checksummed() {
        let usdc = address!("0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48");
        assert_eq!(
            deployment_header("IERC20", "usdc", &usdc),
            "// IERC20 usdc = IERC20(0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48);\n"
        );
    }

    #[test]
    fn test_parse_address() {
        let parse = |addr| parse_address(&record("k", "Foo", "K", addr));
        assert_eq!(
            parse("0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48").unwrap(),
            address!("0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48")
        );
        assert_eq!(
            parse("0Xdac17f958d2ee523a2206206994597c13d831ec7").unwrap(),
            address!("0xdAC17F958D2ee523a2206206994597C13D831ec7")
        );
        for bad in [
            "",
            "0x",
            "0x2",
            "1234",
            "0xzz",
            // one digit short of usdc
            "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB4",
            "0x00000000000000000000000000000000000000001",
        ] {
            assert!(
                matches!(parse(bad), Err(LoaderError::InvalidAddress { .. })),
                "{bad}"
            );
        }
    }

    #[test]
    fn test_header_address_pads_short_literals() {
        let header = |addr| header_address(&record("k", "Foo", "K", addr));
        assert_eq!(
            header("0x2").unwrap(),
            address!("0x0000000000000000000000000000000000000002")
        );
        assert_eq!(
            header("0xdac17f958d2ee523a2206206994597c13d831ec7").unwrap(),
            address!("0xdAC17F958D2ee523a2206206994597C13D831ec7")
        );
        for bad in ["", "0x", "2", "0xg1"] {
            assert!(
                matches!(header(bad), Err(LoaderError::InvalidAddress { .. })),
                "{bad}"
            );
        }
    }

    #[test]
    fn test_sol_generator_output_is_normalized() {
        let abi: JsonAbi = serde_json::from_str(ERC20_ABI).unwrap();
        let body = SolInterfaceGenerator.generate(&abi, "IERC20");
        assert!(body.contains("pragma solidity ^0.8.0;"));
        assert!(body.contains("interface IERC20"));
        assert!(body.contains("function balanceOf(address owner)"));

        assert_eq!(normalize_interface_source(&body), body);
    }

    #[test]
    fn test_write_one_file_per_interface() {
        let out = TempDir::new().unwrap();
        let registry = Registry::from_records(vec![
            record("a", "Foo", "A", "0x1"),
            record("w", "IWETH", "WETH", "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2"),
            record("b", "Foo", "B", "0x2"),
        ])
        .unwrap();
        let source = MemAbiSource::with(&[("b", ERC20_ABI), ("w", WETH_ABI)]);

        let written =
            write_interfaces(&registry, &source, &LegacyGenerator, out.path(), "sol").unwrap();
        assert_eq!(
            written,
            [out.path().join("Foo.sol"), out.path().join("IWETH.sol")]
        );

        let foo = fs::read_to_string(out.path().join("Foo.sol")).unwrap();
        let lines: Vec<_> = foo.lines().collect();
        assert_eq!(
            lines[0],
            "// Foo a = Foo(0x0000000000000000000000000000000000000001);"
        );
        assert_eq!(
            lines[1],
            "// Foo b = Foo(0x0000000000000000000000000000000000000002);"
        );
        assert_eq!(lines[2], "pragma solidity ^0.6.0;");
        assert_eq!(foo.matches("fallback () external payable;").count(), 2);
        assert!(!foo.contains("function () external payable;"));
    }

    #[test]
    fn test_rerun_overwrites() {
        let out = TempDir::new().unwrap();
        let registry = Registry::from_records(vec![record(
            "a",
            "Foo",
            "A",
            "0x0000000000000000000000000000000000000001",
        )])
        .unwrap();
        let source = MemAbiSource::with(&[("a", ERC20_ABI)]);

        let path = out.path().join("Foo.sol");
        fs::write(&path, "stale content\n").unwrap();
        write_interfaces(&registry, &source, &LegacyGenerator, out.path(), "sol").unwrap();
        let first = fs::read_to_string(&path).unwrap();
        write_interfaces(&registry, &source, &LegacyGenerator, out.path(), "sol").unwrap();

        assert!(!first.contains("stale content"));
        assert_eq!(fs::read_to_string(&path).unwrap(), first);
    }

    #[test]
    fn test_missing_abi_keeps_earlier_groups() {
        let out = TempDir::new().unwrap();
        let registry = Registry::from_records(vec![
            record("a", "Foo", "A", "0x0000000000000000000000000000000000000001"),
            record("x", "Bar", "X", "0x0000000000000000000000000000000000000002"),
            record("y", "Baz", "Y", "0x0000000000000000000000000000000000000003"),
        ])
        .unwrap();
        let source = MemAbiSource::with(&[("a", ERC20_ABI), ("y", ERC20_ABI)]);

        let err = write_interfaces(&registry, &source, &LegacyGenerator, out.path(), "sol")
            .unwrap_err();
        assert!(matches!(err, LoaderError::MissingAbi { iface_name } if iface_name == "Bar"));
        assert!(out.path().join("Foo.sol").exists());
        assert!(!out.path().join("Bar.sol").exists());
        assert!(!out.path().join("Baz.sol").exists());
    }

    #[test]
    fn test_missing_output_dir_is_write_error() {
        let out = TempDir::new().unwrap();
        let registry = Registry::from_records(vec![record(
            "a",
            "Foo",
            "A",
            "0x0000000000000000000000000000000000000001",
        )])
        .unwrap();
        let source = MemAbiSource::with(&[("a", ERC20_ABI)]);

        let missing = out.path().join("does/not/exist");
        let err =
            write_interfaces(&registry, &source, &LegacyGenerator, &missing, "sol").unwrap_err();
        assert!(matches!(err, LoaderError::OutputWrite { .. }));
    }

    #[test]
    fn test_invalid_address_names_key() {
        let out = TempDir::new().unwrap();
        let registry =
            Registry::from_records(vec![record("a", "Foo", "A", "not-an-address")]).unwrap();
        let source = MemAbiSource::with(&[("a", ERC20_ABI)]);
        let err = write_interfaces(&registry, &source, &LegacyGenerator, out.path(), "sol")
            .unwrap_err();
        assert!(matches!(err, LoaderError::InvalidAddress { key, .. } if key == "a"));
    }
}
