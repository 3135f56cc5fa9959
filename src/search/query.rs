/// How many source IPs the query asks for, and how many we keep from the
/// results.
pub const TOP_TALKERS: usize = 20;

/// Quote every IP and join them with commas, like `'10.0.0.1','10.0.0.2'`.
///
/// Quotes inside an IP aren't escaped, so garbage in gives a broken query.
pub fn quote_ip_list(ips: &[String]) -> String {
    ips.iter()
        .map(|ip| format!("'{ip}'"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Build the AQL that groups flows towards the given destinations by source
/// IP, sorted by total packets.
pub fn build_query_expression(ips: &[String]) -> String {
    let ip_list = quote_ip_list(ips);

    format!(
        r#"
    SELECT
        sourceip,
        destinationip,
        SUM((SourcePackets + DestinationPackets)) AS 'Total Packets (Sum)',
        UniqueCount("flowType") AS 'Flow Type (Unique Count)',
        MIN("firstPacketTime") AS 'First Packet Time (Minimum)',
        MIN("endTime") AS 'Storage Time (Minimum)',
        UniqueCount("sourcePort") AS 'Source Port (Unique Count)',
        UniqueCount("destinationPort") AS 'Destination Port (Unique Count)',
        SUM("sourceBytes") AS 'Source Bytes (Sum)',
        SUM("destinationBytes") AS 'Destination Bytes (Sum)',
        SUM((SourceBytes + DestinationBytes)) AS 'Total Bytes (Sum)',
        SUM("sourcePackets") AS 'Source Packets (Sum)',
        SUM("destinationPackets") AS 'Destination Packets (Sum)',
        UniqueCount("protocolId") AS 'Protocol (Unique Count)',
        UniqueCount(APPLICATIONNAME(applicationid)) AS 'Application (Unique Count)',
        UniqueCount((IcmpType * 256 + IcmpCode)) AS 'ICMP Type/Code (Unique Count)',
        UniqueCount("sourceFlags") AS 'Source Flags (Unique Count)',
        UniqueCount("destinationFlags") AS 'Destination Flags (Unique Count)',
        UniqueCount((SourceDSCP << 2) & 0xFC + (SourcePrecedence << 5) & 0xE0) AS 'Source QoS (Unique Count)',
        UniqueCount((DestinationDSCP << 2) & 0xFC + (DestinationPrecedence << 5) & 0xE0) AS 'Destination QoS (Unique Count)',
        UniqueCount("flowSource") AS 'Flow Source (Unique Count)',
        UniqueCount("sourceASN") AS 'Source ASN (Unique Count)',
        UniqueCount("destinationASN") AS 'Destination ASN (Unique Count)',
        COUNT(*) AS 'Count'
    FROM flows10
    WHERE destinationip IN ({ip_list})
    GROUP BY sourceip
    ORDER BY "Total Packets (Sum)" DESC
    LIMIT {TOP_TALKERS}
    "#
    )
}
