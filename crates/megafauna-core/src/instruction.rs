//! Reading the TOML instruction file: global parameters, HFT groups, and
//! the HFT list.
//!
//! The file is walked manually through [`toml::Value`] so that every error
//! carries the fully qualified key and, for enum-like strings, the complete
//! list of valid options.

use std::path::Path;
use std::sync::Arc;

use toml::value::{Table, Value};

use crate::error::MegafaunaError;
use crate::hft::{
    ConductanceModel, DietComposer, DigestionType, DigestiveLimit, ExpenditureComponent,
    ForagingLimit, Hft, MortalityFactor, NetEnergyModel, ReproductionModel,
};
use crate::parameters::{
    ForageDistributionAlgorithm, HerbivoreType, OutputFormat, OutputInterval, Parameters,
};

/// Everything an instruction file defines.
#[derive(Debug)]
pub struct InstructionContent {
    pub params: Parameters,
    pub hfts: Vec<Arc<Hft>>,
}

/// Read and validate an instruction file from disk.
pub fn read_instruction_file(path: &Path) -> Result<InstructionContent, MegafaunaError> {
    let text = std::fs::read_to_string(path).map_err(|source| {
        MegafaunaError::InstructionFileIo {
            path: path.display().to_string(),
            source,
        }
    })?;
    parse_instruction(&text)
}

/// Parse and validate instruction-file text.
pub fn parse_instruction(text: &str) -> Result<InstructionContent, MegafaunaError> {
    let root: Table = text
        .parse::<Value>()
        .map_err(|e| MegafaunaError::InstructionFileSyntax(e.to_string()))?
        .as_table()
        .cloned()
        .ok_or_else(|| {
            MegafaunaError::InstructionFileSyntax("the file root is not a table".into())
        })?;

    let params = read_parameters(&root)?;
    params.validate()?;

    let groups = match root.get("group") {
        Some(value) => value
            .as_table()
            .ok_or(MegafaunaError::WrongType {
                key: "group".into(),
                expected: "table of group tables",
            })?
            .clone(),
        None => Table::new(),
    };

    let hft_entries = match root.get("hft") {
        Some(value) => value
            .as_array()
            .ok_or(MegafaunaError::WrongType {
                key: "hft".into(),
                expected: "array of tables",
            })?
            .clone(),
        None => Vec::new(),
    };
    if hft_entries.is_empty() {
        return Err(MegafaunaError::NoHftDefined);
    }

    let mut hfts: Vec<Arc<Hft>> = Vec::with_capacity(hft_entries.len());
    for entry in &hft_entries {
        let table = entry.as_table().ok_or(MegafaunaError::WrongType {
            key: "hft".into(),
            expected: "table",
        })?;
        let hft = read_hft(table, &groups)?;
        if hfts.iter().any(|existing| existing.name == hft.name) {
            return Err(MegafaunaError::DuplicateHft(hft.name));
        }
        hft.validate()?;
        hfts.push(Arc::new(hft));
    }

    Ok(InstructionContent { params, hfts })
}

// ------------------------------------------------------------------
// Global parameters

fn read_parameters(root: &Table) -> Result<Parameters, MegafaunaError> {
    let mut params = Parameters::default();

    if let Some(simulation) = get_table(root, "", "simulation")? {
        if let Some(value) = get_str(&simulation, "simulation", "forage_distribution")? {
            params.forage_distribution = parse_option(
                "simulation.forage_distribution",
                &value,
                &[("Equally", ForageDistributionAlgorithm::Equally)],
            )?;
        }
        if let Some(value) = get_f64(&simulation, "simulation", "habitat_area_km2")? {
            params.habitat_area_km2 = value;
        }
        if let Some(value) = get_u64(&simulation, "simulation", "establish_interval")? {
            params.establish_interval = value as u32;
        }
        if let Some(value) = get_str(&simulation, "simulation", "herbivore_type")? {
            params.herbivore_type = parse_option(
                "simulation.herbivore_type",
                &value,
                &[
                    ("Cohort", HerbivoreType::Cohort),
                    ("Individual", HerbivoreType::Individual),
                ],
            )?;
        }
        if let Some(value) = get_u64(&simulation, "simulation", "seed")? {
            params.seed = value;
        }
    }

    if let Some(output) = get_table(root, "", "output")? {
        if let Some(value) = get_str(&output, "output", "format")? {
            params.output_format = parse_option(
                "output.format",
                &value,
                &[("TextTables", OutputFormat::TextTables)],
            )?;
        }
        if let Some(value) = get_str(&output, "output", "interval")? {
            params.output_interval = parse_option(
                "output.interval",
                &value,
                &[
                    ("Daily", OutputInterval::Daily),
                    ("Monthly", OutputInterval::Monthly),
                    ("Annual", OutputInterval::Annual),
                    ("Decadal", OutputInterval::Decadal),
                ],
            )?;
        }
        if let Some(tables) = get_table(&output, "output", "text_tables")? {
            let options = &mut params.text_tables;
            let path = "output.text_tables";
            if let Some(value) = get_str(&tables, path, "directory")? {
                options.directory = value;
            }
            if let Some(value) = get_u64(&tables, path, "precision")? {
                options.precision = value as usize;
            }
            for (key, field) in [
                ("available_forage", &mut options.available_forage as &mut bool),
                ("digestibility", &mut options.digestibility),
                ("body_fat", &mut options.body_fat),
                ("individual_density", &mut options.individual_density),
                ("mass_density", &mut options.mass_density),
                ("eaten_forage_per_ind", &mut options.eaten_forage_per_ind),
                (
                    "eaten_nitrogen_per_ind",
                    &mut options.eaten_nitrogen_per_ind,
                ),
            ] {
                if let Some(value) = get_bool(&tables, path, key)? {
                    *field = value;
                }
            }
        }
    }

    Ok(params)
}

// ------------------------------------------------------------------
// HFTs

fn read_hft(table: &Table, groups: &Table) -> Result<Hft, MegafaunaError> {
    let name = get_str(table, "hft", "name")?.ok_or(MegafaunaError::MissingParameter {
        key: "hft.name".into(),
    })?;

    // Merge the named groups underneath the HFT's own keys: parameters not
    // set on the HFT inherit from its groups, earlier groups first.
    let mut merged = Table::new();
    if let Some(group_list) = table.get("groups") {
        let list = group_list.as_array().ok_or(MegafaunaError::WrongType {
            key: format!("hft.{name}.groups"),
            expected: "array of group names",
        })?;
        for group_name in list {
            let group_name = group_name.as_str().ok_or(MegafaunaError::WrongType {
                key: format!("hft.{name}.groups"),
                expected: "string",
            })?;
            let group = groups
                .get(group_name)
                .and_then(Value::as_table)
                .ok_or_else(|| MegafaunaError::UnknownGroup(group_name.to_string()))?;
            deep_merge(&mut merged, group);
        }
    }
    deep_merge(&mut merged, table);

    let defaults = Hft::default();
    let mut hft = Hft {
        name: name.clone(),
        ..defaults
    };
    let prefix = format!("hft.{name}");
    let require = |key: &str, found: bool| -> Result<(), MegafaunaError> {
        if found {
            Ok(())
        } else {
            Err(MegafaunaError::MissingHftParameter {
                hft: name.clone(),
                key: key.into(),
            })
        }
    };

    // --- body_fat ---
    if let Some(body_fat) = get_table(&merged, &prefix, "body_fat")? {
        let path = format!("{prefix}.body_fat");
        let maximum = get_f64(&body_fat, &path, "maximum")?;
        require("body_fat.maximum", maximum.is_some())?;
        hft.body_fat.maximum = maximum.unwrap();
        if let Some(value) = get_f64(&body_fat, &path, "birth")? {
            hft.body_fat.birth = value;
        } else {
            hft.body_fat.birth = hft.body_fat.birth.min(hft.body_fat.maximum);
        }
        if let Some(value) = get_f64(&body_fat, &path, "maximum_daily_gain")? {
            hft.body_fat.maximum_daily_gain = value;
        }
        if let Some(value) = get_f64(&body_fat, &path, "deviation")? {
            hft.body_fat.deviation = value;
        }
    } else {
        require("body_fat.maximum", false)?;
    }

    // --- body_mass ---
    if let Some(body_mass) = get_table(&merged, &prefix, "body_mass")? {
        let path = format!("{prefix}.body_mass");
        let female = get_f64(&body_mass, &path, "female")?;
        require("body_mass.female", female.is_some())?;
        hft.body_mass.female = female.unwrap();
        let male = get_f64(&body_mass, &path, "male")?;
        require("body_mass.male", male.is_some())?;
        hft.body_mass.male = male.unwrap();
        if let Some(value) = get_f64(&body_mass, &path, "birth")? {
            hft.body_mass.birth = value;
        }
    } else {
        require("body_mass.female", false)?;
    }

    // --- digestion ---
    let digestion = get_table(&merged, &prefix, "digestion")?;
    match &digestion {
        Some(digestion) => {
            let path = format!("{prefix}.digestion");
            let kind = get_str(digestion, &path, "type")?;
            require("digestion.type", kind.is_some())?;
            hft.digestion.digestion_type = parse_option(
                &format!("{path}.type"),
                &kind.unwrap(),
                &[
                    ("Ruminant", DigestionType::Ruminant),
                    ("Hindgut", DigestionType::Hindgut),
                ],
            )?;
            let limit = get_str(digestion, &path, "limit")?;
            require("digestion.limit", limit.is_some())?;
            hft.digestion.limit = parse_option(
                &format!("{path}.limit"),
                &limit.unwrap(),
                &[
                    ("None", DigestiveLimit::None),
                    ("Allometric", DigestiveLimit::Allometric),
                    ("FixedFraction", DigestiveLimit::FixedFraction),
                    ("IlliusGordon1992", DigestiveLimit::IlliusGordon1992),
                ],
            )?;
            // Dependent parameters become mandatory with their model.
            match hft.digestion.limit {
                DigestiveLimit::FixedFraction => {
                    let value = get_f64(digestion, &path, "fixed_fraction")?;
                    require("digestion.fixed_fraction", value.is_some())?;
                    hft.digestion.fixed_fraction = value.unwrap();
                }
                DigestiveLimit::Allometric => {
                    let allometry =
                        read_allometry(digestion, &format!("{path}.allometric"), "allometric")?;
                    require("digestion.allometric", allometry.is_some())?;
                    hft.digestion.allometric = allometry.unwrap();
                }
                DigestiveLimit::None | DigestiveLimit::IlliusGordon1992 => {}
            }
        }
        None => require("digestion.type", false)?,
    }

    // --- establishment ---
    if let Some(establishment) = get_table(&merged, &prefix, "establishment")? {
        let path = format!("{prefix}.establishment");
        let density = get_f64(&establishment, &path, "density")?;
        require("establishment.density", density.is_some())?;
        hft.establishment.density = density.unwrap();
        if let Some(value) = establishment.get("age_range") {
            let range = value.as_array().ok_or(MegafaunaError::WrongType {
                key: format!("{path}.age_range"),
                expected: "array of two integers [youngest, oldest]",
            })?;
            if range.len() != 2 {
                return Err(MegafaunaError::WrongType {
                    key: format!("{path}.age_range"),
                    expected: "array of two integers [youngest, oldest]",
                });
            }
            let bound = |v: &Value| -> Result<u16, MegafaunaError> {
                v.as_integer()
                    .filter(|i| (0..=u16::MAX as i64).contains(i))
                    .map(|i| i as u16)
                    .ok_or(MegafaunaError::WrongType {
                        key: format!("{path}.age_range"),
                        expected: "non-negative integer",
                    })
            };
            hft.establishment.age_range = (bound(&range[0])?, bound(&range[1])?);
        }
    } else {
        require("establishment.density", false)?;
    }

    // --- expenditure ---
    let expenditure = get_table(&merged, &prefix, "expenditure")?;
    match &expenditure {
        Some(expenditure) => {
            let path = format!("{prefix}.expenditure");
            let components = get_str_array(expenditure, &path, "components")?;
            require("expenditure.components", components.is_some())?;
            hft.expenditure.components = components
                .unwrap()
                .iter()
                .map(|value| {
                    parse_option(
                        &format!("{path}.components"),
                        value,
                        &[
                            ("Allometric", ExpenditureComponent::Allometric),
                            ("Taylor1981", ExpenditureComponent::Taylor1981),
                            ("Zhu2018", ExpenditureComponent::Zhu2018),
                            ("Thermoregulation", ExpenditureComponent::Thermoregulation),
                        ],
                    )
                })
                .collect::<Result<_, _>>()?;
            if hft
                .expenditure
                .components
                .contains(&ExpenditureComponent::Allometric)
            {
                let allometry =
                    read_allometry(expenditure, &format!("{path}.allometric"), "allometric")?;
                require("expenditure.allometric", allometry.is_some())?;
                hft.expenditure.allometric = allometry.unwrap();
            }
        }
        None => require("expenditure.components", false)?,
    }

    // --- foraging ---
    let foraging = get_table(&merged, &prefix, "foraging")?;
    match &foraging {
        Some(foraging) => {
            let path = format!("{prefix}.foraging");
            let composer = get_str(foraging, &path, "diet_composer")?;
            require("foraging.diet_composer", composer.is_some())?;
            hft.foraging.diet_composer = parse_option(
                &format!("{path}.diet_composer"),
                &composer.unwrap(),
                &[("PureGrazer", DietComposer::PureGrazer)],
            )?;
            let model = get_str(foraging, &path, "net_energy_model")?;
            require("foraging.net_energy_model", model.is_some())?;
            hft.foraging.net_energy_model = parse_option(
                &format!("{path}.net_energy_model"),
                &model.unwrap(),
                &[("Default", NetEnergyModel::Default)],
            )?;
            if let Some(limits) = get_str_array(foraging, &path, "limits")? {
                hft.foraging.limits = limits
                    .iter()
                    .map(|value| {
                        parse_option(
                            &format!("{path}.limits"),
                            value,
                            &[
                                (
                                    "GeneralFunctionalResponse",
                                    ForagingLimit::GeneralFunctionalResponse,
                                ),
                                ("IlliusOConnor2000", ForagingLimit::IlliusOConnor2000),
                            ],
                        )
                    })
                    .collect::<Result<_, _>>()?;
            }
            if !hft.foraging.limits.is_empty() {
                let density = get_f64(foraging, &path, "half_max_intake_density")?;
                require("foraging.half_max_intake_density", density.is_some())?;
                hft.foraging.half_max_intake_density = density.unwrap();
            }
        }
        None => require("foraging.diet_composer", false)?,
    }

    // --- life_history ---
    if let Some(life_history) = get_table(&merged, &prefix, "life_history")? {
        let path = format!("{prefix}.life_history");
        for (key, field) in [
            ("lifespan", &mut hft.life_history.lifespan as &mut u16),
            (
                "physical_maturity_female",
                &mut hft.life_history.physical_maturity_female,
            ),
            (
                "physical_maturity_male",
                &mut hft.life_history.physical_maturity_male,
            ),
            ("sexual_maturity", &mut hft.life_history.sexual_maturity),
        ] {
            if let Some(value) = get_u64(&life_history, &path, key)? {
                *field = value as u16;
            }
        }
    }

    // --- mortality ---
    if let Some(mortality) = get_table(&merged, &prefix, "mortality")? {
        let path = format!("{prefix}.mortality");
        if let Some(factors) = get_str_array(&mortality, &path, "factors")? {
            hft.mortality.factors = factors
                .iter()
                .map(|value| {
                    parse_option(
                        &format!("{path}.factors"),
                        value,
                        &[
                            ("Background", MortalityFactor::Background),
                            ("Lifespan", MortalityFactor::Lifespan),
                            (
                                "StarvationIlliusOConnor2000",
                                MortalityFactor::StarvationIlliusOConnor2000,
                            ),
                            ("StarvationThreshold", MortalityFactor::StarvationThreshold),
                        ],
                    )
                })
                .collect::<Result<_, _>>()?;
        }
        if hft
            .mortality
            .factors
            .contains(&MortalityFactor::Background)
        {
            if let Some(value) = get_f64(&mortality, &path, "adult_rate")? {
                hft.mortality.adult_rate = value;
            }
            if let Some(value) = get_f64(&mortality, &path, "juvenile_rate")? {
                hft.mortality.juvenile_rate = value;
            }
        }
        if let Some(value) = get_f64(&mortality, &path, "minimum_density_threshold")? {
            hft.mortality.minimum_density_threshold = value;
        }
        if let Some(value) = get_bool(&mortality, &path, "shift_body_condition_for_starvation")? {
            hft.mortality.shift_body_condition_for_starvation = value;
        }
    }

    // --- reproduction ---
    let reproduction = get_table(&merged, &prefix, "reproduction")?;
    match &reproduction {
        Some(reproduction) => {
            let path = format!("{prefix}.reproduction");
            let model = get_str(reproduction, &path, "model")?;
            require("reproduction.model", model.is_some())?;
            hft.reproduction.model = parse_option(
                &format!("{path}.model"),
                &model.unwrap(),
                &[
                    ("None", ReproductionModel::None),
                    ("ConstantMaximum", ReproductionModel::ConstantMaximum),
                    ("Linear", ReproductionModel::Linear),
                    ("IlliusOConnor2000", ReproductionModel::IlliusOConnor2000),
                ],
            )?;
            if hft.reproduction.model != ReproductionModel::None {
                if let Some(value) = get_f64(reproduction, &path, "annual_maximum")? {
                    hft.reproduction.annual_maximum = value;
                }
                if let Some(value) = get_u64(reproduction, &path, "gestation_months")? {
                    hft.reproduction.gestation_months = value as u16;
                }
            }
        }
        None => require("reproduction.model", false)?,
    }

    // --- breeding_season ---
    if let Some(breeding_season) = get_table(&merged, &prefix, "breeding_season")? {
        let path = format!("{prefix}.breeding_season");
        if let Some(value) = get_u64(&breeding_season, &path, "start")? {
            hft.breeding_season.start = value as u16;
        }
        if let Some(value) = get_u64(&breeding_season, &path, "length")? {
            hft.breeding_season.length = value as u16;
        }
    }

    // --- thermoregulation ---
    if let Some(thermoregulation) = get_table(&merged, &prefix, "thermoregulation")? {
        let path = format!("{prefix}.thermoregulation");
        if let Some(value) = get_str(&thermoregulation, &path, "conductance")? {
            hft.thermoregulation.conductance = parse_option(
                &format!("{path}.conductance"),
                &value,
                &[
                    ("BradleyDeavers1980", ConductanceModel::BradleyDeavers1980),
                    (
                        "CuylerOeritsland2004",
                        ConductanceModel::CuylerOeritsland2004,
                    ),
                ],
            )?;
        }
        if let Some(value) = get_f64(&thermoregulation, &path, "core_temperature")? {
            hft.thermoregulation.core_temperature = value;
        }
    }

    // Without reproduction there is no juvenile phase to model.
    if hft.reproduction.model == ReproductionModel::None {
        hft.life_history.physical_maturity_female = 1;
        hft.life_history.physical_maturity_male = 1;
    }

    Ok(hft)
}

fn read_allometry(
    table: &Table,
    path: &str,
    key: &str,
) -> Result<Option<crate::hft::Allometry>, MegafaunaError> {
    let Some(value) = table.get(key) else {
        return Ok(None);
    };
    let allometry = value.as_table().ok_or(MegafaunaError::WrongType {
        key: path.to_string(),
        expected: "table with keys \"coefficient\" and \"exponent\"",
    })?;
    let coefficient =
        get_f64(allometry, path, "coefficient")?.ok_or(MegafaunaError::MissingParameter {
            key: format!("{path}.coefficient"),
        })?;
    let exponent =
        get_f64(allometry, path, "exponent")?.ok_or(MegafaunaError::MissingParameter {
            key: format!("{path}.exponent"),
        })?;
    Ok(Some(crate::hft::Allometry {
        coefficient,
        exponent,
    }))
}

// ------------------------------------------------------------------
// Value access helpers

fn qualify(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{path}.{key}")
    }
}

fn get_table(table: &Table, path: &str, key: &str) -> Result<Option<Table>, MegafaunaError> {
    match table.get(key) {
        None => Ok(None),
        Some(value) => value
            .as_table()
            .cloned()
            .map(Some)
            .ok_or(MegafaunaError::WrongType {
                key: qualify(path, key),
                expected: "table",
            }),
    }
}

fn get_f64(table: &Table, path: &str, key: &str) -> Result<Option<f64>, MegafaunaError> {
    match table.get(key) {
        None => Ok(None),
        Some(Value::Float(f)) => Ok(Some(*f)),
        Some(Value::Integer(i)) => Ok(Some(*i as f64)),
        Some(_) => Err(MegafaunaError::WrongType {
            key: qualify(path, key),
            expected: "number",
        }),
    }
}

fn get_u64(table: &Table, path: &str, key: &str) -> Result<Option<u64>, MegafaunaError> {
    match table.get(key) {
        None => Ok(None),
        Some(Value::Integer(i)) if *i >= 0 => Ok(Some(*i as u64)),
        Some(_) => Err(MegafaunaError::WrongType {
            key: qualify(path, key),
            expected: "non-negative integer",
        }),
    }
}

fn get_bool(table: &Table, path: &str, key: &str) -> Result<Option<bool>, MegafaunaError> {
    match table.get(key) {
        None => Ok(None),
        Some(Value::Boolean(b)) => Ok(Some(*b)),
        Some(_) => Err(MegafaunaError::WrongType {
            key: qualify(path, key),
            expected: "boolean",
        }),
    }
}

fn get_str(table: &Table, path: &str, key: &str) -> Result<Option<String>, MegafaunaError> {
    match table.get(key) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(MegafaunaError::WrongType {
            key: qualify(path, key),
            expected: "string",
        }),
    }
}

fn get_str_array(
    table: &Table,
    path: &str,
    key: &str,
) -> Result<Option<Vec<String>>, MegafaunaError> {
    match table.get(key) {
        None => Ok(None),
        Some(Value::Array(values)) => values
            .iter()
            .map(|v| {
                v.as_str()
                    .map(str::to_string)
                    .ok_or(MegafaunaError::WrongType {
                        key: qualify(path, key),
                        expected: "array of strings",
                    })
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Some),
        Some(_) => Err(MegafaunaError::WrongType {
            key: qualify(path, key),
            expected: "array of strings",
        }),
    }
}

/// Match a string against the valid options, rejecting unknown values with
/// the full option list.
fn parse_option<T: Copy>(
    key: &str,
    value: &str,
    options: &[(&str, T)],
) -> Result<T, MegafaunaError> {
    options
        .iter()
        .find(|(name, _)| *name == value)
        .map(|(_, v)| *v)
        .ok_or_else(|| MegafaunaError::InvalidOption {
            key: key.to_string(),
            value: value.to_string(),
            valid_options: options.iter().map(|(name, _)| name.to_string()).collect(),
        })
}

/// Recursively merge `overlay` into `base`; scalar keys in `overlay` win,
/// nested tables merge key by key.
fn deep_merge(base: &mut Table, overlay: &Table) {
    for (key, value) in overlay {
        if let (Some(Value::Table(base_table)), Value::Table(overlay_table)) =
            (base.get_mut(key), value)
        {
            deep_merge(base_table, overlay_table);
            continue;
        }
        base.insert(key.clone(), value.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        [[hft]]
        name = "deer"
        body_fat.maximum = 0.25
        body_mass.female = 50
        body_mass.male = 70
        digestion.limit = "IlliusGordon1992"
        digestion.type = "Ruminant"
        establishment.density = 1.0
        expenditure.components = ["Taylor1981"]
        foraging.diet_composer = "PureGrazer"
        foraging.net_energy_model = "Default"
        reproduction.model = "ConstantMaximum"
    "#;

    #[test]
    fn minimal_instruction_parses() {
        let content = parse_instruction(MINIMAL).unwrap();
        assert_eq!(content.hfts.len(), 1);
        let hft = &content.hfts[0];
        assert_eq!(hft.name, "deer");
        assert_eq!(hft.digestion.limit, DigestiveLimit::IlliusGordon1992);
        assert_eq!(hft.body_mass.male, 70.0);
        // Unset parameters fall back to defaults.
        assert_eq!(hft.life_history.lifespan, 16);
    }

    #[test]
    fn missing_mandatory_parameter_is_reported_with_key() {
        let text = MINIMAL.replace("body_fat.maximum = 0.25", "");
        let err = parse_instruction(&text).unwrap_err();
        match err {
            MegafaunaError::MissingHftParameter { hft, key } => {
                assert_eq!(hft, "deer");
                assert_eq!(key, "body_fat.maximum");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unknown_enum_value_lists_valid_options() {
        let text = MINIMAL.replace("\"Ruminant\"", "\"Carnivore\"");
        let err = parse_instruction(&text).unwrap_err();
        match err {
            MegafaunaError::InvalidOption {
                key,
                value,
                valid_options,
            } => {
                assert_eq!(key, "hft.deer.digestion.type");
                assert_eq!(value, "Carnivore");
                assert_eq!(valid_options, vec!["Ruminant", "Hindgut"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn dependent_parameter_is_mandatory_with_its_model() {
        let text = MINIMAL.replace("\"IlliusGordon1992\"", "\"FixedFraction\"");
        let err = parse_instruction(&text).unwrap_err();
        match err {
            MegafaunaError::MissingHftParameter { key, .. } => {
                assert_eq!(key, "digestion.fixed_fraction");
            }
            other => panic!("unexpected error: {other}"),
        }

        let text = MINIMAL.replace(
            "digestion.limit = \"IlliusGordon1992\"",
            "digestion.limit = \"FixedFraction\"\ndigestion.fixed_fraction = 0.04",
        );
        let content = parse_instruction(&text).unwrap();
        assert_eq!(content.hfts[0].digestion.fixed_fraction, 0.04);
    }

    #[test]
    fn groups_provide_inherited_parameters() {
        let text = r#"
            [group.ruminants]
            digestion.type = "Ruminant"
            digestion.limit = "IlliusGordon1992"
            body_fat.maximum = 0.3

            [[hft]]
            name = "deer"
            groups = ["ruminants"]
            body_mass.female = 50
            body_mass.male = 70
            body_fat.maximum = 0.25
            establishment.density = 1.0
            expenditure.components = ["Taylor1981"]
            foraging.diet_composer = "PureGrazer"
            foraging.net_energy_model = "Default"
            reproduction.model = "ConstantMaximum"
        "#;
        let content = parse_instruction(text).unwrap();
        let hft = &content.hfts[0];
        // Inherited from the group:
        assert_eq!(hft.digestion.digestion_type, DigestionType::Ruminant);
        // The HFT's own value overrides the group:
        assert_eq!(hft.body_fat.maximum, 0.25);
    }

    #[test]
    fn unknown_group_is_rejected() {
        let text = MINIMAL.replace("name = \"deer\"", "name = \"deer\"\ngroups = [\"nope\"]");
        assert!(matches!(
            parse_instruction(&text),
            Err(MegafaunaError::UnknownGroup(name)) if name == "nope"
        ));
    }

    #[test]
    fn duplicate_hft_names_are_rejected() {
        let text = format!("{MINIMAL}\n{MINIMAL}");
        assert!(matches!(
            parse_instruction(&text),
            Err(MegafaunaError::DuplicateHft(_))
        ));
    }

    #[test]
    fn empty_file_has_no_hft() {
        assert!(matches!(
            parse_instruction(""),
            Err(MegafaunaError::NoHftDefined)
        ));
    }

    #[test]
    fn simulation_and_output_tables_are_read() {
        let text = format!(
            r#"
            [simulation]
            herbivore_type = "Cohort"
            establish_interval = 30
            seed = 7

            [output]
            interval = "Monthly"
            text_tables.directory = "results"
            text_tables.mass_density = true
            text_tables.digestibility = true
            {MINIMAL}
        "#
        );
        let content = parse_instruction(&text).unwrap();
        assert_eq!(content.params.establish_interval, 30);
        assert_eq!(content.params.seed, 7);
        assert_eq!(content.params.output_interval, OutputInterval::Monthly);
        assert_eq!(content.params.text_tables.directory, "results");
        assert!(content.params.text_tables.digestibility);
    }

    #[test]
    fn reproduction_none_disables_juvenile_phase() {
        let text = MINIMAL.replace("\"ConstantMaximum\"", "\"None\"");
        let content = parse_instruction(&text).unwrap();
        assert_eq!(content.hfts[0].life_history.physical_maturity_female, 1);
        assert_eq!(content.hfts[0].life_history.physical_maturity_male, 1);
    }

    #[test]
    fn invalid_toml_syntax_is_reported() {
        assert!(matches!(
            parse_instruction("[[hft]\nname="),
            Err(MegafaunaError::InstructionFileSyntax(_))
        ));
    }
}
