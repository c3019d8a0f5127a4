use anyhow::Result;
use schemars::schema_for;

use olmctl::registry::AliasRegistry;
use olmctl_common::operator_info::RegistryFile;

fn main() -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&schema_for!(RegistryFile))?);
    println!("---");
    print!("{}", serde_yaml::to_string(&AliasRegistry::builtin().to_file())?);
    Ok(())
}
