//! Similarity rules between card identities.

use cardwatch::matching::{core_name, normalize_name, normalize_number, same};
use cardwatch::models::CardIdentity;

fn id(name: &str, number: &str) -> CardIdentity {
    CardIdentity::new(name, number)
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

#[test]
fn normalize_name_lowercases_and_collapses() {
    assert_eq!(normalize_name("  Gardevoir   EX "), "gardevoir ex");
    assert_eq!(normalize_name(""), "");
}

#[test]
fn normalize_number_strips_leading_zeros() {
    assert_eq!(normalize_number("080"), "80");
    assert_eq!(normalize_number("348"), "348");
    assert_eq!(normalize_number("000"), "0");
    assert_eq!(normalize_number(""), "0");
}

#[test]
fn core_name_drops_noise_tokens() {
    assert_eq!(core_name("pokemon japanese gardevoir ex (sv4a)"), "gardevoir");
    assert_eq!(core_name("pikachu s12a promo"), "pikachu");
    assert_eq!(core_name("charizard & blastoise"), "charizard blastoise");
    assert_eq!(core_name("pokemon japanese"), "");
}

#[test]
fn core_name_drops_set_code_shaped_tokens() {
    assert_eq!(core_name("mewtwo sm12a"), "mewtwo");
    assert_eq!(core_name("mewtwo sv12"), "mewtwo");
    assert_eq!(core_name("mewtwo swsh"), "mewtwo swsh");
}

// ---------------------------------------------------------------------------
// same: numbers
// ---------------------------------------------------------------------------

#[test]
fn identical_identities_match() {
    let a = id("Gardevoir ex", "348");
    assert!(same(&a, &a));
}

#[test]
fn zero_padding_is_insignificant() {
    assert!(same(&id("Magikarp", "080"), &id("Magikarp", "80")));
    assert!(same(&id("Magikarp", "80"), &id("Magikarp", "080")));
}

#[test]
fn empty_number_equals_zero() {
    assert!(same(&id("Energy", ""), &id("Energy", "0")));
}

#[test]
fn different_numbers_never_match() {
    assert!(!same(&id("Gardevoir ex", "348"), &id("Gardevoir ex", "349")));
    assert!(!same(&id("Pikachu", "25"), &id("Pikachu", "")));
}

// ---------------------------------------------------------------------------
// same: names
// ---------------------------------------------------------------------------

#[test]
fn case_and_spacing_are_insignificant() {
    assert!(same(&id("GARDEVOIR  ex", "348"), &id("gardevoir ex", "348")));
}

#[test]
fn core_names_match_across_marketplace_qualifiers() {
    let tcg = id("Gardevoir ex", "348");
    let pc = id("Gardevoir ex Pokemon Japanese SV4a", "348");
    assert!(same(&tcg, &pc));
    assert!(same(&pc, &tcg));
}

#[test]
fn containment_matches_longer_name() {
    assert!(same(&id("Charizard VMAX", "20"), &id("Charizard", "020")));
    assert!(same(&id("Charizard", "020"), &id("Charizard VMAX", "20")));
}

#[test]
fn unrelated_names_do_not_match() {
    assert!(!same(&id("Pikachu", "25"), &id("Raichu", "25")));
}

#[test]
fn noise_only_name_matches_nothing_by_containment() {
    assert!(!same(&id("Pokemon Japanese", "25"), &id("Raichu", "25")));
    assert!(!same(&id("Raichu", "25"), &id("Pokemon Japanese", "25")));
    assert!(!same(&id("Pokemon", "25"), &id("Japanese", "25")));
}

#[test]
fn embedded_number_matches_in_one_order_only() {
    let plain = id("Pikachu Illustrator", "80");
    let padded = id("Pikachu 080 Illustrator", "080");

    // The last rule removes the second identity's raw number from its name.
    assert!(same(&plain, &padded));
    assert!(!same(&padded, &plain));
}
