//! Property-based test generators for write workloads.

use proptest::prelude::*;

/// Writes a workload issues: one payload per write.
#[derive(Debug, Clone)]
pub struct Workload {
    /// Rotation threshold.
    pub max_size_bytes: u64,
    /// Payloads in issue order.
    pub payloads: Vec<Vec<u8>>,
}

impl Workload {
    /// Total bytes across all payloads.
    pub fn total_bytes(&self) -> u64 {
        self.payloads.iter().map(|p| p.len() as u64).sum()
    }

    /// Rotations a sequential writer performs for this workload.
    ///
    /// A write goes into the live file if the file is empty or the write
    /// fits; otherwise it rotates first.
    pub fn expected_rotations(&self) -> u64 {
        let mut rotations = 0;
        let mut written = 0u64;
        for payload in &self.payloads {
            let len = payload.len() as u64;
            if written != 0 && written + len > self.max_size_bytes {
                rotations += 1;
                written = 0;
            }
            written += len;
        }
        rotations
    }
}

/// Generates a single payload of printable bytes ending in a newline.
pub fn arb_line(max_len: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(0x20u8..0x7f, 0..max_len).prop_map(|mut line| {
        line.push(b'\n');
        line
    })
}

/// Generates a workload with a small threshold so rotations are frequent.
pub fn arb_workload() -> impl Strategy<Value = Workload> {
    (16u64..256, prop::collection::vec(arb_line(64), 1..80)).prop_map(
        |(max_size_bytes, payloads)| Workload {
            max_size_bytes,
            payloads,
        },
    )
}
