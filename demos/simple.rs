use bel_core::{validate, FileFetcher, MemoryStore, ValidatorConfig};

fn main() {
    let bel_script = r#"
SET DOCUMENT Name = "Demo"
DEFINE NAMESPACE CHEBI AS LIST {"water", "ethanol"}
DEFINE ANNOTATION Species AS PATTERN "[0-9]+"

SET Citation = {"PubMed", "A demo citation", "12345"}
SET Species = 9606
a(CHEBI:ethanol) -| a(CHEBI:water)
a(CHEBI:wine) -> p(HGNC:AKT1)
"#;

    let mut store = MemoryStore::new();
    let config = ValidatorConfig::default();
    match validate(bel_script, "demo.bel", &mut store, &FileFetcher::new(), &config) {
        Ok(result) => {
            for record in result.records() {
                println!("{record}");
            }
            println!("{}", result.render_diagnostics());
            match result.to_json() {
                Ok(json) => println!("Document model as JSON:\n{json}"),
                Err(e) => eprintln!("Failed to serialize: {e}"),
            }
        }
        Err(e) => {
            eprintln!("Failed to validate BEL: {e:?}");
        }
    }
}
