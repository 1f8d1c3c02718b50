use crate::output::{print_json, print_table};
use cpack_core::ident::{lower_first, normalize};
use serde::Serialize;

#[derive(Serialize)]
struct Identifier {
    input: String,
    identifier: String,
    condition: String,
}

pub fn run(texts: &[String], json: bool) -> anyhow::Result<()> {
    let idents: Vec<Identifier> = texts
        .iter()
        .map(|t| {
            let identifier = normalize(t);
            Identifier {
                input: t.clone(),
                condition: lower_first(&identifier),
                identifier,
            }
        })
        .collect();

    if json {
        return print_json(&idents);
    }

    let rows: Vec<Vec<String>> = idents
        .into_iter()
        .map(|i| vec![i.input, i.identifier, i.condition])
        .collect();
    print_table(&["INPUT", "IDENTIFIER", "CONDITION"], &rows);
    Ok(())
}
