use std::collections::HashMap;

/// Translates between Ensembl (`1`, `MT`) and UCSC (`chr1`, `chrM`) chromosome names.
///
/// Unknown names pass through unchanged.
#[derive(Clone, Debug, Default)]
pub struct ChromosomeRenamer {
    ensembl_to_ucsc: HashMap<String, String>,
    ucsc_to_ensembl: HashMap<String, String>,
}
impl ChromosomeRenamer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of the human nuclear and mitochondrial chromosomes
    #[must_use]
    pub fn human() -> Self {
        let mut renamer = Self::new();
        for i in 1..=22 {
            renamer.add(&i.to_string(), &format!("chr{i}"));
        }
        renamer.add("X", "chrX");
        renamer.add("Y", "chrY");
        renamer.add("MT", "chrM");
        renamer
    }

    pub fn add(&mut self, ensembl: &str, ucsc: &str) {
        self.ensembl_to_ucsc
            .insert(ensembl.to_string(), ucsc.to_string());
        self.ucsc_to_ensembl
            .insert(ucsc.to_string(), ensembl.to_string());
    }

    #[must_use]
    pub fn ucsc_name<'a>(&'a self, name: &'a str) -> &'a str {
        self.ensembl_to_ucsc.get(name).map_or(name, String::as_str)
    }

    #[must_use]
    pub fn ensembl_name<'a>(&'a self, name: &'a str) -> &'a str {
        self.ucsc_to_ensembl.get(name).map_or(name, String::as_str)
    }
}
