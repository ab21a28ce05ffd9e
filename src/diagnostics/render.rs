use std::net::IpAddr;

use super::{Hop, TraceOptions};
use crate::util::format_latency;

pub fn header(host: &str, address: IpAddr, options: &TraceOptions) -> String {
    format!(
        "traceroute to {host} ({address}), {} hops max, {} byte packets",
        options.max_hops, options.packet_size
    )
}

pub fn hop(hop: &Hop) -> String {
    let ttl = hop.ttl;
    if !hop.success {
        return format!("{ttl:<3} *");
    }

    let address = hop
        .address
        .map(|address| address.to_string())
        .unwrap_or_else(|| String::from("?"));
    let name = hop.host.as_deref().unwrap_or(&address);
    let elapsed = hop.elapsed.map(format_latency).unwrap_or_default();

    format!("{ttl:<3} {name} ({address})  {elapsed}")
}
