use phf::{Map, phf_map};

/// Reference energies (eV per atom) of the elements a probe may contain.
static ELEMENT_REFERENCE_ENERGIES: Map<&'static str, f64> = phf_map! {
    "H" => -3.379,
    "O" => -7.459,
    "C" => -7.329,
};

pub fn element_reference_energy(symbol: &str) -> Option<f64> {
    ELEMENT_REFERENCE_ENERGIES.get(symbol).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_elements_have_reference_energies() {
        assert_eq!(element_reference_energy("O"), Some(-7.459));
        assert_eq!(element_reference_energy("C"), Some(-7.329));
        assert_eq!(element_reference_energy("Xe"), None);
    }
}
