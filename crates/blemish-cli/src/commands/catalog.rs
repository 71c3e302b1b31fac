use blemish_core::sync::HttpRemote;
use blemish_core::InspectionService;

use crate::config::CliConfig;
use crate::error::CliError;

pub async fn run_refresh(service: &InspectionService, config: &CliConfig) -> Result<(), CliError> {
    let remote = HttpRemote::new(config.require_api_url()?)?;

    let products = remote.fetch_products().await?;
    let workstations = remote.fetch_workstations().await?;
    let defect_types = remote.fetch_defect_types().await?;

    service
        .replace_catalogs(&products, &workstations, &defect_types)
        .await?;

    println!(
        "Cached {} product(s), {} workstation(s), {} defect type(s)",
        products.len(),
        workstations.len(),
        defect_types.len()
    );
    Ok(())
}

pub async fn run_list(service: &InspectionService) -> Result<(), CliError> {
    let products = service.list_products().await?;
    let workstations = service.list_workstations().await?;
    let defect_types = service.list_defect_types().await?;

    if products.is_empty() && workstations.is_empty() && defect_types.is_empty() {
        println!("No catalogs cached. Run `blemish catalog refresh` while online.");
        return Ok(());
    }

    println!("Products:");
    for product in &products {
        println!("  {:>5}  {}", product.id, product.name);
    }
    println!("Workstations:");
    for workstation in &workstations {
        println!("  {:>5}  {}", workstation.id, workstation.name);
    }
    println!("Defect types:");
    for defect_type in &defect_types {
        println!("  {:>5}  {}", defect_type.id, defect_type.label);
    }
    Ok(())
}
