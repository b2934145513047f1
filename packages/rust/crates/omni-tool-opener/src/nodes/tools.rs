use omni_tool_opener::RuntimeSettings;

pub(crate) fn run_tools_mode(runtime_settings: &RuntimeSettings) -> anyhow::Result<()> {
    let catalog = runtime_settings.catalog();
    println!("{}", serde_json::to_string_pretty(&catalog.entries())?);
    Ok(())
}
