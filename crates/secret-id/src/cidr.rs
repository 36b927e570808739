//! CIDR parsing and subset checks for SecretID source restrictions.

use std::net::IpAddr;

use ipnet::IpNet;

use crate::error::{Result, SecretIdError};

/// Parses a CIDR block, accepting a bare address as a host block.
///
/// `10.0.0.1` becomes `10.0.0.1/32` and `::1` becomes `::1/128`. Host bits
/// in a block are cleared (`10.0.0.7/24` becomes `10.0.0.0/24`).
///
/// # Errors
///
/// Returns [`SecretIdError::InvalidCidr`] if `value` is neither a block nor an
/// address.
pub fn parse_cidr(value: &str) -> Result<IpNet> {
    let value = value.trim();
    value
        .parse::<IpNet>()
        .or_else(|_| value.parse::<IpAddr>().map(IpNet::from))
        .map(|net| net.trunc())
        .map_err(|_| SecretIdError::InvalidCidr(value.to_owned()))
}

/// Parses every entry of `values`, stopping at the first invalid one.
///
/// # Errors
///
/// Returns [`SecretIdError::InvalidCidr`] naming the first invalid entry.
pub fn parse_cidrs<S: AsRef<str>>(values: &[S]) -> Result<Vec<IpNet>> {
    values.iter().map(|v| parse_cidr(v.as_ref())).collect()
}

/// Checks that every block in `entry_cidrs` lies inside the role's bound CIDRs.
///
/// An empty entry list passes without looking at the role's blocks, and a
/// role with no bound CIDRs accepts anything. Otherwise each entry block
/// must be covered by the union of the role's blocks, so `10.0.0.0/24` is
/// accepted by a role bound to `10.0.0.0/25` and `10.0.0.128/25`.
///
/// # Errors
///
/// - [`SecretIdError::InvalidCidr`] if either list has an unparseable entry.
/// - [`SecretIdError::CidrNotSubset`] listing both sets if a block escapes.
pub fn verify_subset<S, R>(entry_cidrs: &[S], role_cidrs: &[R]) -> Result<()>
where
    S: AsRef<str>,
    R: AsRef<str>,
{
    if entry_cidrs.is_empty() || role_cidrs.is_empty() {
        return Ok(());
    }

    let entry_nets = parse_cidrs(entry_cidrs)?;
    let role_nets = parse_cidrs(role_cidrs)?;
    // Aggregation merges adjacent and overlapping blocks into maximal aligned
    // blocks, so an entry block inside the union lies inside one of them.
    let merged = IpNet::aggregate(&role_nets);

    if entry_nets.iter().all(|e| merged.iter().any(|r| r.contains(e))) {
        return Ok(());
    }

    Err(SecretIdError::CidrNotSubset {
        entry_cidrs: entry_cidrs.iter().map(|s| s.as_ref().to_owned()).collect(),
        role_cidrs: role_cidrs.iter().map(|s| s.as_ref().to_owned()).collect(),
    })
}

/// Strips leading zeroes from each octet of an IPv4 address or block.
///
/// `010.000.0.1/24` becomes `10.0.0.1/24`. IPv6 values and anything that is
/// not dotted are returned unchanged. Older entries were written before
/// addresses were canonicalized; the strict parser rejects zero-padded octets.
#[must_use]
pub fn trim_leading_zeroes(value: &str) -> String {
    let (addr, prefix_len) = match value.split_once('/') {
        Some((addr, len)) => (addr, Some(len)),
        None => (value, None),
    };
    if addr.contains(':') || !addr.contains('.') {
        return value.to_owned();
    }

    let mut out = addr
        .split('.')
        .map(|octet| match octet.trim_start_matches('0') {
            "" if !octet.is_empty() => "0",
            trimmed => trimmed,
        })
        .collect::<Vec<_>>()
        .join(".");
    if let Some(len) = prefix_len {
        out.push('/');
        out.push_str(len);
    }
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use rstest::rstest;

    use super::*;

    const NONE: &[&str] = &[];

    #[rstest]
    #[case::bare_v4("10.0.0.1", "10.0.0.1/32")]
    #[case::bare_v6("::1", "::1/128")]
    #[case::block("10.0.0.0/24", "10.0.0.0/24")]
    #[case::host_bits_cleared("10.0.0.7/24", "10.0.0.0/24")]
    #[case::surrounding_space(" 192.168.1.0/28 ", "192.168.1.0/28")]
    fn parse_normalizes(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(parse_cidr(input).unwrap().to_string(), expected);
    }

    #[rstest]
    #[case::garbage("not-an-ip")]
    #[case::bad_prefix("10.0.0.0/33")]
    #[case::empty("")]
    fn parse_rejects(#[case] input: &str) {
        assert!(matches!(parse_cidr(input), Err(SecretIdError::InvalidCidr(_))));
    }

    #[rstest]
    #[case::host_in_block(&["10.0.0.1"], &["10.0.0.0/24"])]
    #[case::block_in_block(&["10.0.0.0/26"], &["10.0.0.0/24"])]
    #[case::equal_blocks(&["10.0.0.0/24"], &["10.0.0.0/24"])]
    #[case::covered_by_union(&["10.0.0.0/24"], &["10.0.0.0/25", "10.0.0.128/25"])]
    #[case::each_in_different_block(
        &["10.0.0.5", "172.16.3.0/24"],
        &["10.0.0.0/24", "172.16.0.0/16"]
    )]
    #[case::v6(&["2001:db8::1"], &["2001:db8::/32"])]
    #[case::no_entry_blocks(NONE, &["10.0.0.0/8"])]
    fn subset_accepted(#[case] entry: &[&str], #[case] role: &[&str]) {
        verify_subset(entry, role).unwrap();
    }

    #[rstest]
    #[case::disjoint(&["10.0.0.1"], &["192.168.0.0/24"])]
    #[case::wider_than_role(&["10.0.0.0/16"], &["10.0.0.0/24"])]
    #[case::gap_in_union(&["10.0.0.0/24"], &["10.0.0.0/25", "10.0.0.192/26"])]
    #[case::family_mismatch(&["::ffff:10.0.0.1"], &["10.0.0.0/8"])]
    fn subset_rejected(#[case] entry: &[&str], #[case] role: &[&str]) {
        let err = verify_subset(entry, role).unwrap_err();
        match err {
            SecretIdError::CidrNotSubset { entry_cidrs, role_cidrs } => {
                assert_eq!(entry_cidrs, entry);
                assert_eq!(role_cidrs, role);
            },
            other => panic!("expected CidrNotSubset, got {other:?}"),
        }
    }

    #[test]
    fn empty_role_accepts_anything() {
        verify_subset(&["0.0.0.0/0", "not even parsed"], NONE).unwrap();
    }

    #[test]
    fn empty_entry_list_ignores_role_blocks() {
        verify_subset(NONE, &["10.0.0.0/33", "garbage"]).unwrap();
    }

    #[test]
    fn invalid_entry_reported_before_subset_check() {
        let err = verify_subset(&["10.0.0.300"], &["10.0.0.0/8"]).unwrap_err();
        assert!(matches!(err, SecretIdError::InvalidCidr(v) if v == "10.0.0.300"));
    }

    #[rstest]
    #[case::padded_block("010.000.0.1/24", "10.0.0.1/24")]
    #[case::padded_addr("192.168.001.010", "192.168.1.10")]
    #[case::zero_octet("00.0.000.0/0", "0.0.0.0/0")]
    #[case::already_clean("10.0.0.1/32", "10.0.0.1/32")]
    #[case::v6_untouched("2001:0db8::/32", "2001:0db8::/32")]
    fn trims_zero_padded_octets(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(trim_leading_zeroes(input), expected);
    }

    #[test]
    fn trimmed_value_parses() {
        let trimmed = trim_leading_zeroes("010.000.000.001/8");
        assert_eq!(parse_cidr(&trimmed).unwrap().to_string(), "10.0.0.0/8");
    }
}
