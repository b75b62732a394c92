//! `toolgate tools`: list the tool registry.

use crate::tools::ToolRegistry;

pub fn run_tools_command(json: bool) -> anyhow::Result<()> {
    let registry = ToolRegistry::builtin();
    if json {
        println!("{}", serde_json::to_string_pretty(&registry.summaries())?);
        return Ok(());
    }

    println!("Registered tools");
    println!("================\n");
    for tool in registry.list() {
        println!("  {}", tool.id);
        println!("    Image: {}", tool.image);
        println!("    {}", tool.description);
        for param in tool.params {
            println!(
                "    --{} ({}{})",
                param.name,
                if param.required { "required, " } else { "" },
                param.description
            );
        }
        println!();
    }
    Ok(())
}
