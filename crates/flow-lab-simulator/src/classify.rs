use crate::threshold::Thresholds;
use flow_lab_abstract::FlowStatus;

/// FAILURE when throughput is under the low bar or delay is over the high bar.
pub fn classify(throughput: f64, delay: f64, thresholds: &Thresholds) -> FlowStatus {
    classify_values(
        throughput,
        delay,
        thresholds.low_throughput.value,
        thresholds.high_delay.value,
    )
}

pub fn classify_values(throughput: f64, delay: f64, low_throughput: f64, high_delay: f64) -> FlowStatus {
    if throughput < low_throughput || delay > high_delay {
        FlowStatus::Failure
    } else {
        FlowStatus::Ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_iff_low_throughput_or_high_delay() {
        let grid = [-1.0, 0.0, 0.01, 1.0, 5.0, f64::INFINITY];
        for &throughput in &grid {
            for &delay in &grid {
                for &low in &grid {
                    for &high in &grid {
                        let expected = throughput < low || delay > high;
                        let status = classify_values(throughput, delay, low, high);
                        assert_eq!(
                            status == FlowStatus::Failure,
                            expected,
                            "tp={throughput} d={delay} low={low} high={high}"
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn equal_to_threshold_is_ok() {
        assert_eq!(classify_values(0.0, 0.0, 0.0, 0.0), FlowStatus::Ok);
        assert_eq!(classify_values(2.0, 0.5, 2.0, 0.5), FlowStatus::Ok);
    }

    #[test]
    fn either_condition_fails() {
        assert_eq!(classify_values(0.9, 0.1, 1.0, 0.5), FlowStatus::Failure);
        assert_eq!(classify_values(3.0, 0.6, 1.0, 0.5), FlowStatus::Failure);
    }
}
