use flow_lab_abstract::{DerivedMetric, FlowKey, MetricKind, RawFlowCounters};

/// Mean throughput in Mbps between first transmission and last reception.
/// 0.0 until traffic has been observed.
pub fn derive_throughput(rx_bytes: u64, time_first_tx: f64, time_last_rx: f64) -> f64 {
    if time_last_rx > time_first_tx {
        (rx_bytes as f64 * 8.0) / (time_last_rx - time_first_tx) / 1e6
    } else {
        0.0
    }
}

/// Mean one-way delay in seconds. 0.0 when nothing was received.
pub fn derive_delay(delay_sum: f64, rx_packets: u64) -> f64 {
    if rx_packets > 0 {
        delay_sum / rx_packets as f64
    } else {
        0.0
    }
}

/// Derives the (throughput, delay) pair for one flow at one tick.
pub fn derive(flow: FlowKey, counters: &RawFlowCounters, tick: f64) -> (DerivedMetric, DerivedMetric) {
    let throughput = DerivedMetric {
        kind: MetricKind::Throughput,
        value: derive_throughput(counters.rx_bytes, counters.time_first_tx, counters.time_last_rx),
        flow,
        tick,
    };
    let delay = DerivedMetric {
        kind: MetricKind::Delay,
        value: derive_delay(counters.delay_sum, counters.rx_packets),
        flow,
        tick,
    };
    (throughput, delay)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flow_lab_abstract::flow::protocol;
    use std::net::{Ipv4Addr, SocketAddrV4};

    #[test]
    fn throughput_is_zero_without_elapsed_time() {
        assert_eq!(derive_throughput(10_000, 1.0, 1.0), 0.0);
        assert_eq!(derive_throughput(10_000, 2.0, 1.5), 0.0);
        assert_eq!(derive_throughput(0, 0.0, 0.0), 0.0);
    }

    #[test]
    fn throughput_in_mbps() {
        assert_eq!(derive_throughput(625_000, 1.0, 2.0), 5.0);
        assert_eq!(derive_throughput(250_000, 0.0, 2.0), 1.0);
    }

    #[test]
    fn delay_is_zero_without_packets() {
        assert_eq!(derive_delay(0.0, 0), 0.0);
        assert_eq!(derive_delay(3.5, 0), 0.0);
        assert_eq!(derive_delay(0.02, 2), 0.01);
    }

    #[test]
    fn derive_tags_both_metrics() {
        let flow = FlowKey::new(
            7,
            SocketAddrV4::new(Ipv4Addr::new(10, 1, 1, 1), 49153),
            SocketAddrV4::new(Ipv4Addr::new(10, 1, 1, 2), 50000),
            protocol::TCP,
        );
        let counters = RawFlowCounters {
            rx_bytes: 625_000,
            rx_packets: 2,
            delay_sum: 0.02,
            time_first_tx: 1.0,
            time_last_rx: 2.0,
        };
        let (throughput, delay) = derive(flow, &counters, 2.0);
        assert_eq!(throughput.kind, MetricKind::Throughput);
        assert_eq!(throughput.value, 5.0);
        assert_eq!(delay.kind, MetricKind::Delay);
        assert_eq!(delay.value, 0.01);
        assert_eq!(throughput.flow, flow);
        assert_eq!(delay.tick, 2.0);

        // Same input, same output.
        assert_eq!(derive(flow, &counters, 2.0), (throughput, delay));
    }
}
