use crate::drivers::eri_consistency::{EriConsistencyDriver, EriConsistencyParams};
use crate::drivers::HfpDriver;
use crate::interfaces::custom::custom_fixtures::lih_rhf;
use crate::interfaces::custom::CustomHfProvider;

#[test]
fn test_drivers_eri_consistency_default_blocks() {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut provider = CustomHfProvider::new(lih_rhf()).unwrap();
    let params = EriConsistencyParams::default();
    let mut driver = EriConsistencyDriver::builder()
        .parameters(&params)
        .provider(&mut provider)
        .build()
        .unwrap();
    driver.run().unwrap();
    let result = driver.result().unwrap();
    assert_eq!(result.deviations.len(), 6 * 16);
    assert_eq!(result.deviations[0].label, "oooo [aaaa]");
    assert_eq!(result.deviations[1].label, "oooo [aaab]");
    assert_eq!(result.deviations[0].ranges, [0..2, 0..2, 0..2, 0..2]);
    assert!(result.passed());
    assert!(result.max_deviation() <= 1e-10);

    drop(driver);
    assert!(!provider.holds_full_eri_tensor());
    assert_eq!(provider.eri_builder().n_cached_blocks(), 0);
}

#[test]
fn test_drivers_eri_consistency_alpha_only() {
    let mut provider = CustomHfProvider::new(lih_rhf()).unwrap();
    let params = EriConsistencyParams::builder()
        .block_patterns(vec!["ovov".to_string(), "OVVV".to_string()])
        .all_spin_blocks(false)
        .build()
        .unwrap();
    let mut driver = EriConsistencyDriver::builder()
        .parameters(&params)
        .provider(&mut provider)
        .build()
        .unwrap();
    driver.run().unwrap();
    let labels = driver
        .result()
        .unwrap()
        .deviations
        .iter()
        .map(|deviation| deviation.label.clone())
        .collect::<Vec<_>>();
    assert_eq!(labels, vec!["ovov [aaaa]", "OVVV [aaaa]"]);
}

#[test]
fn test_drivers_eri_consistency_bad_pattern() {
    let mut provider = CustomHfProvider::new(lih_rhf()).unwrap();
    let params = EriConsistencyParams::builder()
        .block_patterns(vec!["oovx".to_string()])
        .build()
        .unwrap();
    let mut driver = EriConsistencyDriver::builder()
        .parameters(&params)
        .provider(&mut provider)
        .build()
        .unwrap();
    assert!(driver.run().is_err());
    assert!(driver.result().is_err());
}

#[test]
fn test_drivers_eri_consistency_params_from_yaml() {
    let params = serde_yaml::from_str::<EriConsistencyParams>("threshold: 1.0e-12\n").unwrap();
    assert_eq!(params.threshold, 1e-12);
    assert_eq!(params.block_patterns.len(), 6);
    assert!(params.all_spin_blocks);
}
