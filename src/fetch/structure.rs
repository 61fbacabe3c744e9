use std::io::Write;

use super::name_list;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::materials::{MaterialSummary, StructureSession};
use crate::structure::Structure;

const MAX_LISTED_SITES: usize = 10;

/// Result of one structure retrieval. Failures are already reported to the
/// writer when this is returned.
#[derive(Debug)]
pub enum StructureOutcome {
    Found(Structure),
    NotFound,
    Failed(Error),
}

/// Message printed when the report cannot be produced.
pub fn failure_line(e: &Error) -> String {
    format!("Error fetching structure: {e}")
}

/// Load configuration, open a session, and run [`fetch_structure`].
///
/// Configuration errors are returned before `open` is called.
pub fn run_structure<S, L, F, W>(
    load_config: L,
    open: F,
    material_id: &str,
    out: &mut W,
) -> Result<StructureOutcome>
where
    S: StructureSession,
    L: FnOnce() -> Result<Config>,
    F: FnOnce(&Config) -> Result<S>,
    W: Write,
{
    let config = load_config()?;
    let session = match open(&config) {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!("cannot open structure session: {e}");
            writeln!(out, "{}", failure_line(&e))?;
            return Ok(StructureOutcome::Failed(e));
        }
    };
    fetch_structure(session, material_id, out)
}

/// Retrieve and print one structure.
///
/// Takes the session by value; it is released when this returns, on every
/// path.
pub fn fetch_structure<S, W>(session: S, material_id: &str, out: &mut W) -> Result<StructureOutcome>
where
    S: StructureSession,
    W: Write,
{
    let structure = match session.get_structure_by_material_id(material_id) {
        Ok(Some(s)) => s,
        Ok(None) => {
            writeln!(out, "No structure data found for {material_id}")?;
            return Ok(StructureOutcome::NotFound);
        }
        Err(e) => {
            tracing::warn!(material_id, "structure retrieval failed: {e}");
            writeln!(out, "{}", failure_line(&e))?;
            return Ok(StructureOutcome::Failed(e));
        }
    };

    let summary = match session.get_material_summary(material_id) {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!(material_id, "material summary unavailable: {e}");
            None
        }
    };

    write_structure(out, material_id, &structure, summary.as_ref())?;
    Ok(StructureOutcome::Found(structure))
}

/// Print the structure report: composition, symmetry, lattice, sites.
pub fn write_structure<W: Write>(
    out: &mut W,
    material_id: &str,
    structure: &Structure,
    summary: Option<&MaterialSummary>,
) -> Result<()> {
    let composition = structure.composition();
    let n_sites = structure.sites.len();

    writeln!(out, "Crystal structure for {material_id}:")?;
    writeln!(out, "Formula: {}", composition.reduced_formula())?;
    writeln!(out, "Number of sites: {n_sites}")?;
    writeln!(out, "Elements: {}", name_list(&composition.elements()))?;

    match structure.space_group_info() {
        Ok((symbol, number)) => {
            writeln!(out, "Space group symbol: {symbol}")?;
            writeln!(out, "Space group number: {number}")?;
        }
        Err(e) => {
            tracing::debug!("{e}");
            writeln!(out, "Space group info not available")?;
        }
    }

    let lattice = &structure.lattice;
    writeln!(out, "\nLattice parameters:")?;
    writeln!(out, "  a = {:.4} Å", lattice.a())?;
    writeln!(out, "  b = {:.4} Å", lattice.b())?;
    writeln!(out, "  c = {:.4} Å", lattice.c())?;
    writeln!(out, "  α = {:.2}°", lattice.alpha())?;
    writeln!(out, "  β = {:.2}°", lattice.beta())?;
    writeln!(out, "  γ = {:.2}°", lattice.gamma())?;
    writeln!(out, "  Volume = {:.4} Å³", lattice.volume())?;

    writeln!(out, "\nStructure contains {n_sites} atomic sites:")?;
    for (i, site) in structure.sites.iter().take(MAX_LISTED_SITES).enumerate() {
        let [x, y, z] = site.xyz;
        writeln!(
            out,
            "  Site {}: {} at [{x:.4}, {y:.4}, {z:.4}]",
            i + 1,
            site.species_label()
        )?;
    }
    if n_sites > MAX_LISTED_SITES {
        writeln!(out, "  ... and {} more sites", n_sites - MAX_LISTED_SITES)?;
    }

    if let Some(s) = summary {
        if let Some(e) = s.formation_energy_per_atom {
            writeln!(out, "\nFormation energy per atom: {e:.4} eV/atom")?;
        }
        if let Some(g) = s.band_gap {
            writeln!(out, "Band gap: {g:.4} eV")?;
        }
        if let Some(e) = s.energy_per_atom {
            writeln!(out, "Energy per atom: {e:.4} eV/atom")?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;
    use crate::structure::tests::fcc_pt;
    use crate::structure::{Lattice, Site, Symmetry};

    enum Reply {
        Structure(Structure),
        Empty,
        Fail(&'static str),
    }

    /// Session stub that records calls and its own release.
    struct StubSession {
        reply: Option<Reply>,
        summary: Option<MaterialSummary>,
        calls: Rc<Cell<usize>>,
        released: Rc<Cell<bool>>,
    }

    impl StubSession {
        fn new(reply: Reply) -> Self {
            Self {
                reply: Some(reply),
                summary: None,
                calls: Rc::new(Cell::new(0)),
                released: Rc::new(Cell::new(false)),
            }
        }
    }

    impl Drop for StubSession {
        fn drop(&mut self) {
            self.released.set(true);
        }
    }

    impl StructureSession for StubSession {
        fn get_structure_by_material_id(&self, _id: &str) -> Result<Option<Structure>> {
            self.calls.set(self.calls.get() + 1);
            match &self.reply {
                Some(Reply::Structure(s)) => Ok(Some(s.clone())),
                Some(Reply::Empty) | None => Ok(None),
                Some(Reply::Fail(msg)) => Err(Error::Api {
                    status: 500,
                    message: msg.to_string(),
                }),
            }
        }

        fn get_material_summary(&self, _id: &str) -> Result<Option<MaterialSummary>> {
            Ok(self.summary.clone())
        }
    }

    fn chain(n: usize) -> Structure {
        let lattice = Lattice::from_parameters(2.0 * n as f64, 5.0, 5.0, 90.0, 90.0, 90.0);
        let sites = (0..n)
            .map(|i| {
                let f = [i as f64 / n as f64, 0.0, 0.0];
                Site::new(if i % 2 == 0 { "Pt" } else { "Ni" }, lattice.cartesian(f), f)
            })
            .collect();
        Structure::new(lattice, sites)
    }

    fn report(session: StubSession) -> (StructureOutcome, String) {
        let mut out = Vec::new();
        let outcome = fetch_structure(session, "mp-126", &mut out).unwrap();
        (outcome, String::from_utf8(out).unwrap())
    }

    #[test]
    fn lists_ten_sites_and_remainder() {
        let (outcome, text) = report(StubSession::new(Reply::Structure(chain(13))));
        assert!(matches!(outcome, StructureOutcome::Found(_)));
        assert_eq!(text.matches("  Site ").count(), 10);
        assert!(text.contains("  Site 10: Ni at"));
        assert!(!text.contains("  Site 11:"));
        assert!(text.contains("  ... and 3 more sites"));
        assert!(text.contains("Structure contains 13 atomic sites:"));
    }

    #[test]
    fn short_structures_list_every_site() {
        for n in [1, 10] {
            let (_, text) = report(StubSession::new(Reply::Structure(chain(n))));
            assert_eq!(text.matches("  Site ").count(), n);
            assert!(!text.contains("more sites"));
        }
    }

    #[test]
    fn full_report_for_fcc_pt() {
        let structure = fcc_pt().with_symmetry(Symmetry {
            symbol: Some("Fm-3m".into()),
            number: Some(225),
            crystal_system: Some("Cubic".into()),
        });
        let mut session = StubSession::new(Reply::Structure(structure));
        session.summary = Some(MaterialSummary {
            formation_energy_per_atom: Some(0.0),
            band_gap: Some(0.0),
            energy_per_atom: None,
        });
        let (_, text) = report(session);

        assert!(text.contains("Crystal structure for mp-126:"));
        assert!(text.contains("Formula: Pt\n"));
        assert!(text.contains("Number of sites: 4"));
        assert!(text.contains("Elements: ['Pt']"));
        assert!(text.contains("Space group symbol: Fm-3m"));
        assert!(text.contains("Space group number: 225"));
        assert!(text.contains("  a = 3.9242 Å"));
        assert!(text.contains("  α = 90.00°"));
        assert!(text.contains("  Volume = 60.4301 Å³"));
        assert!(text.contains("  Site 2: Pt at [1.9621, 1.9621, 0.0000]"));
        assert!(text.contains("Formation energy per atom: 0.0000 eV/atom"));
        assert!(text.contains("Band gap: 0.0000 eV"));
        assert!(!text.contains("Energy per atom:"));
    }

    #[test]
    fn space_group_failure_keeps_rest_of_report() {
        let (outcome, text) = report(StubSession::new(Reply::Structure(chain(12))));
        assert!(matches!(outcome, StructureOutcome::Found(_)));
        assert!(text.contains("Space group info not available"));
        assert!(!text.contains("Space group symbol"));
        assert!(text.contains("Lattice parameters:"));
        assert!(text.contains("  Volume = "));
        assert_eq!(text.matches("  Site ").count(), 10);
        assert!(text.contains("  ... and 2 more sites"));
    }

    #[test]
    fn retrieval_error_is_printed_and_session_released() {
        let session = StubSession::new(Reply::Fail("upstream timeout"));
        let released = Rc::clone(&session.released);
        let (outcome, text) = report(session);

        assert!(matches!(outcome, StructureOutcome::Failed(_)));
        assert!(text.contains("Error fetching structure: api error (500): upstream timeout"));
        assert!(released.get());
    }

    #[test]
    fn not_found_is_not_an_error() {
        let session = StubSession::new(Reply::Empty);
        let released = Rc::clone(&session.released);
        let (outcome, text) = report(session);

        assert!(matches!(outcome, StructureOutcome::NotFound));
        assert_eq!(text, "No structure data found for mp-126\n");
        assert!(released.get());
    }

    #[test]
    fn missing_credential_never_opens_session() {
        let opened = Cell::new(false);
        let mut out = Vec::new();
        let err = run_structure(
            || Config::from_lookup(|_| None),
            |_| {
                opened.set(true);
                Ok(StubSession::new(Reply::Empty))
            },
            "mp-126",
            &mut out,
        )
        .unwrap_err();

        assert!(matches!(err, Error::MissingApiKey(_)));
        assert_eq!(
            failure_line(&err),
            "Error fetching structure: MP_API_KEY not found in environment variables"
        );
        assert!(!opened.get());
        assert!(out.is_empty());
    }

    #[test]
    fn run_queries_once_and_releases() {
        let session = StubSession::new(Reply::Structure(fcc_pt()));
        let calls = Rc::clone(&session.calls);
        let released = Rc::clone(&session.released);
        let mut out = Vec::new();

        let outcome = run_structure(
            || Config::from_lookup(|k| (k == "MP_API_KEY").then(|| "key".into())),
            move |_| Ok(session),
            "mp-126",
            &mut out,
        )
        .unwrap();

        assert!(matches!(outcome, StructureOutcome::Found(_)));
        assert_eq!(calls.get(), 1);
        assert!(released.get());
    }
}
