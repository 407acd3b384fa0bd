use color_eyre::Result;
use forms::ProviderRegistry;

pub fn run() -> Result<()> {
    let registry = ProviderRegistry::builtin();
    for provider in registry.iter() {
        let windows = if provider.supports_windows { "" } else { "  (not on Windows)" };
        println!("{:<16} {}{windows}", provider.id, provider.display_name);
    }
    Ok(())
}
