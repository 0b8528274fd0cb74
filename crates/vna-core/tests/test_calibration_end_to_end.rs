//! Whole-network calibration against known-good data
//!
//! The raw standards, raw DUT measurement and expected calibrated result
//! come from a recorded 3-point sweep at 1/2/3 MHz with z0 = 50. Every
//! corrected component must match the recording to 1e-9.

use std::collections::BTreeMap;

use anyhow::Result;
use ndarray::Array1;
use num_complex::Complex64;
use vna_core::calibration::dataset::{CalStandard, CalibrationSet};
use vna_core::calibration::{apply, CorrectionError};
use vna_core::network::SNetwork;
use vna_core::params::SParam;

const Z0: f64 = 50.0;
const MHZ: u64 = 1_000_000;

fn c(re: f64, im: f64) -> Complex64 {
    Complex64::new(re, im)
}

fn trace(values: [(f64, f64); 3]) -> Array1<Complex64> {
    Array1::from_vec(values.iter().map(|&(re, im)| c(re, im)).collect())
}

fn freq() -> Vec<u64> {
    vec![MHZ, 2 * MHZ, 3 * MHZ]
}

fn uncalibrated() -> SNetwork {
    let mut traces = BTreeMap::new();
    traces.insert(
        SParam::S11,
        trace([(1.0, 4e-05), (1.0, 3e-05), (1.0, 2.0e-05)]),
    );
    traces.insert(
        SParam::S21,
        trace([(-2270.0, -1010.0), (-3480.0, -770.0), (-2933.0, 648.0)]),
    );
    traces.insert(
        SParam::S12,
        trace([(-1380.0, -1690.0), (-730.0, -1570.0), (-2100.0, 1180.0)]),
    );
    traces.insert(
        SParam::S22,
        trace([(1.0, 1.0e-05), (1.0, -2e-06), (1.0, -2e-05)]),
    );
    SNetwork::new(freq(), Z0, traces).unwrap()
}

fn recorded_calibration() -> CalibrationSet {
    let mut cal = CalibrationSet::new();

    // reflection standards, port 1 then port 2
    cal.set(
        CalStandard::Short,
        SParam::S11,
        trace([
            (495607.8, 158961.6),
            (422794.4, -77247.0),
            (258956.2, -256262.0),
        ]),
    )
    .unwrap();
    cal.set(
        CalStandard::Open,
        SParam::S11,
        trace([
            (-103507.6, 103030.2),
            (-39050.0, 151186.0),
            (46518.4, 163327.2),
        ]),
    )
    .unwrap();
    cal.set(
        CalStandard::Load,
        SParam::S11,
        trace([
            (107190.6, 185938.2),
            (159541.2, 128062.6),
            (180890.8, 43653.8),
        ]),
    )
    .unwrap();
    cal.set(
        CalStandard::Short,
        SParam::S22,
        trace([
            (361065.2, -215336.2),
            (147570.4, -341318.8),
            (-68243.4, -341182.2),
        ]),
    )
    .unwrap();
    cal.set(
        CalStandard::Open,
        SParam::S22,
        trace([
            (16711.4, 108657.4),
            (74518.6, 90616.0),
            (110157.8, 35605.4),
        ]),
    )
    .unwrap();
    cal.set(
        CalStandard::Load,
        SParam::S22,
        trace([
            (191258.4, 32263.0),
            (157767.8, -61217.8),
            (84613.4, -131882.6),
        ]),
    )
    .unwrap();

    // transmission standards, both directions taken in one fitting
    cal.set(
        CalStandard::Open,
        SParam::S21,
        trace([(1159.6, -750.4), (2114.4, -68.2), (2046.2, 443.4)]),
    )
    .unwrap();
    cal.set(
        CalStandard::Through,
        SParam::S21,
        trace([
            (445712.4, 139863.0),
            (313045.6, -210936.8),
            (-11186.6, -337464.8),
        ]),
    )
    .unwrap();
    cal.set(
        CalStandard::Open,
        SParam::S12,
        trace([(34.2, -1773.4), (477.6, -1705.4), (1910.0, -1296.2)]),
    )
    .unwrap();
    cal.set(
        CalStandard::Through,
        SParam::S12,
        trace([
            (289138.6, -141807.0),
            (21247.0, -283341.0),
            (-174717.8, -157904.2),
        ]),
    )
    .unwrap();

    cal.set_sweep(freq(), Z0);
    cal
}

fn expected_dut() -> [(SParam, [(f64, f64); 3]); 4] {
    [
        (
            SParam::S11,
            [
                (0.606576756035065, 0.762588073517888),
                (0.513267531550349, 0.9791358538146341),
                (0.235892205955221, 1.0616400454600028),
            ],
        ),
        (
            SParam::S21,
            [
                (-0.007180986213496086, 0.0016874101047902755),
                (-0.011275636438731433, -0.009904048451696977),
                (-2.8395798205189582e-05, -0.014736475042388703),
            ],
        ),
        (
            SParam::S12,
            [
                (-0.004075270223455314, -0.00168546296895949),
                (-0.000792659613743921, -0.004229355008451727),
                (0.005751344808592438, -0.019118771834241523),
            ],
        ),
        (
            SParam::S22,
            [
                (0.8069678649875225, 0.7892394729459603),
                (0.6180166034864449, 0.852233905016351),
                (0.5742805835193814, 0.7886191880642951),
            ],
        ),
    ]
}

#[test]
fn test_whole_network_calibration_reproduces_recording() -> Result<()> {
    let cal = recorded_calibration();
    let raw = uncalibrated();

    let calibrated = apply(&cal, &raw)?;

    assert_eq!(calibrated.frequencies(), raw.frequencies());
    assert_eq!(calibrated.z0(), Z0);
    for (param, expected) in expected_dut() {
        let got = calibrated
            .get(param)
            .unwrap_or_else(|| panic!("{param} missing from calibrated network"));
        for (i, &(re, im)) in expected.iter().enumerate() {
            let diff = (got[i] - c(re, im)).norm();
            assert!(
                diff < 1e-9,
                "{param}[{i}]: got {}, expected {}+{}i (diff {diff:e})",
                got[i],
                re,
                im
            );
        }
    }
    Ok(())
}

#[test]
fn test_calibration_survives_dump_round_trip() -> Result<()> {
    // persist, restore, and calibrate with the restored dataset
    let cal = recorded_calibration();
    let mut bytes = Vec::new();
    vna_core::calibration::dump::encode(&mut bytes, &cal)?;
    let restored = vna_core::calibration::dump::decode(&mut bytes.as_slice())?;

    let calibrated = apply(&restored, &uncalibrated())?;
    let direct = apply(&cal, &uncalibrated())?;
    assert_eq!(calibrated, direct);
    Ok(())
}

#[test]
fn test_apply_rejects_frequency_mismatch() {
    let cal = recorded_calibration();
    let mut traces = BTreeMap::new();
    traces.insert(SParam::S11, trace([(0.1, 0.0), (0.2, 0.0), (0.3, 0.0)]));
    let raw = SNetwork::new(vec![MHZ, 2 * MHZ, 4 * MHZ], Z0, traces).unwrap();

    let err = apply(&cal, &raw).unwrap_err();
    assert_eq!(err, CorrectionError::FrequencyMismatch);
}

#[test]
fn test_apply_rejects_impedance_mismatch() {
    let cal = recorded_calibration();
    let mut traces = BTreeMap::new();
    traces.insert(SParam::S11, trace([(0.1, 0.0), (0.2, 0.0), (0.3, 0.0)]));
    let raw = SNetwork::new(freq(), 75.0, traces).unwrap();

    let err = apply(&cal, &raw).unwrap_err();
    assert!(matches!(err, CorrectionError::ImpedanceMismatch { .. }));
}

#[test]
fn test_apply_skips_parameters_without_readiness() {
    // drop the short S11 trace: S11 and, through the documented
    // coupling, S21 and S12 all lose readiness; only S22 is corrected
    use vna_core::calibration::dataset::CalSlot;
    let full = recorded_calibration();
    let mut cal = CalibrationSet::new();
    for slot in CalSlot::ALL {
        if slot == CalSlot::ShortS11 {
            continue;
        }
        if let Some(trace) = full.slot(slot) {
            cal.set(slot.standard(), slot.param(), trace.clone()).unwrap();
        }
    }
    cal.set_sweep(freq(), Z0);

    assert!(!cal.ready_for(SParam::S21));
    let calibrated = apply(&cal, &uncalibrated()).unwrap();
    assert!(calibrated.get(SParam::S11).is_none());
    assert!(calibrated.get(SParam::S21).is_none());
    assert!(calibrated.get(SParam::S12).is_none());
    assert!(calibrated.get(SParam::S22).is_some());
}
