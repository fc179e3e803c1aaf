use dwp_config::QualityCfg;
use dwp_core::{CycleType, QualityGrade, classify};
use rstest::rstest;

// Default bands: good 30-45, extended 25-55, marginal 15-70, sensor-low
// below 10, pressure-high above 80.
#[rstest]
#[case(35, 35, QualityGrade::Excellent)]
#[case(30, 45, QualityGrade::Excellent)]
#[case(27, 50, QualityGrade::Good)]
#[case(25, 55, QualityGrade::Good)]
#[case(35, 60, QualityGrade::Marginal)]
#[case(30, 70, QualityGrade::Marginal)]
#[case(16, 44, QualityGrade::Marginal)]
#[case(20, 20, QualityGrade::Defective)]
#[case(5, 5, QualityGrade::SensorLow)]
#[case(9, 9, QualityGrade::SensorLow)]
#[case(85, 35, QualityGrade::PressureHigh)]
#[case(35, 81, QualityGrade::PressureHigh)]
#[case(35, 5, QualityGrade::Defective)]
#[case(80, 30, QualityGrade::Defective)]
fn complete_cycles_grade_by_peak_bands(
    #[case] peak_th: i32,
    #[case] peak_side: i32,
    #[case] expected: QualityGrade,
) {
    let cls = classify(peak_th, peak_side, CycleType::Complete, &QualityCfg::default());
    assert_eq!(cls.grade, expected, "peaks ({peak_th}, {peak_side})");
}

#[rstest]
#[case(CycleType::ShortCycle, QualityGrade::ShortCycle)]
#[case(CycleType::Overflow, QualityGrade::Overflow)]
fn abnormal_cycle_types_override_band_grading(
    #[case] cycle_type: CycleType,
    #[case] expected: QualityGrade,
) {
    // Peaks that would grade Excellent on a complete cycle.
    let cls = classify(35, 35, cycle_type, &QualityCfg::default());
    assert_eq!(cls.grade, expected);
    // Pass flags still reflect the peaks themselves.
    assert!(cls.th_pass);
    assert!(cls.side_pass);
}

#[test]
fn pass_flags_track_the_strict_band_even_when_the_grade_is_good() {
    let cls = classify(27, 50, CycleType::Complete, &QualityCfg::default());
    assert_eq!(cls.grade, QualityGrade::Good);
    assert!(!cls.th_pass);
    assert!(!cls.side_pass);
}

#[test]
fn pass_flags_are_per_channel() {
    let cls = classify(35, 60, CycleType::Complete, &QualityCfg::default());
    assert_eq!(cls.grade, QualityGrade::Marginal);
    assert!(cls.th_pass);
    assert!(!cls.side_pass);
}
