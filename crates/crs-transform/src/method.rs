//! Built-in operation methods and their parameter descriptors.
//!
//! A method pairs a name (plus the aliases vendors actually write) with
//! the descriptor group its parameters must satisfy. Binding a CRS's
//! stored parameter list happens here, before any projection object is
//! built, so an out-of-range value fails as an `InvalidParameterValue`
//! rather than as bad math later.

use std::sync::Arc;

use once_cell::sync::Lazy;

use crs_common::{
    CrsError, Ellipsoid, InvalidParameterValue, ParameterDescriptor, ParameterDescriptorGroup,
    ParameterValueGroup, ProjectionParam, Unit,
};

use crate::mercator::{Mercator, WebMercator};
use crate::transform::ProjectionMath;
use crate::transverse_mercator::TransverseMercator;

pub struct OperationMethod {
    pub name: &'static str,
    aliases: &'static [&'static str],
    pub parameters: Arc<ParameterDescriptorGroup>,
}

fn angular(name: &str, default: f64, min: f64, max: f64) -> Arc<ParameterDescriptor> {
    Arc::new(ParameterDescriptor::new(
        name,
        default,
        Some(min),
        Some(max),
        Some(Unit::degree()),
    ))
}

fn linear(name: &str) -> Arc<ParameterDescriptor> {
    Arc::new(ParameterDescriptor::new(
        name,
        0.0,
        None,
        None,
        Some(Unit::metre()),
    ))
}

fn scale(name: &str) -> Arc<ParameterDescriptor> {
    Arc::new(ParameterDescriptor::new(
        name,
        1.0,
        Some(0.0),
        Some(10.0),
        Some(Unit::unity()),
    ))
}

static METHODS: Lazy<Vec<OperationMethod>> = Lazy::new(|| {
    vec![
        OperationMethod {
            name: "Transverse_Mercator",
            aliases: &["Transverse Mercator", "Gauss_Kruger", "Gauss-Kruger"],
            parameters: Arc::new(ParameterDescriptorGroup::new(
                "Transverse_Mercator",
                vec![
                    angular("central_meridian", 0.0, -180.0, 180.0),
                    angular("latitude_of_origin", 0.0, -90.0, 90.0),
                    scale("scale_factor"),
                    linear("false_easting"),
                    linear("false_northing"),
                ],
            )),
        },
        OperationMethod {
            name: "Mercator_1SP",
            aliases: &["Mercator (1SP)", "Mercator"],
            parameters: Arc::new(ParameterDescriptorGroup::new(
                "Mercator_1SP",
                vec![
                    angular("central_meridian", 0.0, -180.0, 180.0),
                    scale("scale_factor"),
                    linear("false_easting"),
                    linear("false_northing"),
                ],
            )),
        },
        OperationMethod {
            name: "Popular Visualisation Pseudo Mercator",
            aliases: &[
                "Popular_Visualisation_Pseudo_Mercator",
                "Pseudo-Mercator",
                "Mercator_1SP_Spherical",
                "Web Mercator",
            ],
            parameters: Arc::new(ParameterDescriptorGroup::new(
                "Popular Visualisation Pseudo Mercator",
                vec![
                    angular("central_meridian", 0.0, -180.0, 180.0),
                    // Tolerated, always zero in practice.
                    angular("latitude_of_origin", 0.0, -90.0, 90.0),
                    linear("false_easting"),
                    linear("false_northing"),
                ],
            )),
        },
    ]
});

/// Case- and separator-insensitive name form: vendors disagree on
/// spaces versus underscores.
fn canonical(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '_' | '-' => ' ',
            c => c.to_ascii_lowercase(),
        })
        .collect()
}

impl OperationMethod {
    /// Look up a method by its name or any alias.
    pub fn find(name: &str) -> Option<&'static OperationMethod> {
        let wanted = canonical(name);
        METHODS.iter().find(|m| {
            canonical(m.name) == wanted || m.aliases.iter().any(|a| canonical(a) == wanted)
        })
    }

    /// Bind a stored parameter list against this method's descriptors.
    /// Unknown names and out-of-range values fail immediately.
    pub fn bind(&self, params: &[ProjectionParam]) -> Result<ParameterValueGroup, InvalidParameterValue> {
        let mut values = self.parameters.create_value();
        for param in params {
            values.set(&param.name, param.value)?;
        }
        Ok(values)
    }

    /// Build the projection math for bound values on an ellipsoid.
    pub fn instantiate(
        &self,
        ellipsoid: &Ellipsoid,
        values: &ParameterValueGroup,
    ) -> Result<Arc<dyn ProjectionMath>, CrsError> {
        let radian = Unit::radian();
        let metre = Unit::metre();
        match self.name {
            "Transverse_Mercator" => Ok(Arc::new(TransverseMercator::new(
                ellipsoid,
                values.double_in("central_meridian", &radian)?,
                values.double_in("latitude_of_origin", &radian)?,
                values.double("scale_factor")?,
                values.double_in("false_easting", &metre)?,
                values.double_in("false_northing", &metre)?,
            ))),
            "Mercator_1SP" => Ok(Arc::new(Mercator::new(
                ellipsoid,
                values.double_in("central_meridian", &radian)?,
                values.double("scale_factor")?,
                values.double_in("false_easting", &metre)?,
                values.double_in("false_northing", &metre)?,
            ))),
            "Popular Visualisation Pseudo Mercator" => Ok(Arc::new(WebMercator::new(
                ellipsoid,
                values.double_in("central_meridian", &radian)?,
                values.double_in("false_easting", &metre)?,
                values.double_in("false_northing", &metre)?,
            ))),
            other => Err(CrsError::OperationNotFound {
                source_crs: String::new(),
                target_crs: String::new(),
                reason: format!("operation method '{other}' has no implementation"),
            }),
        }
    }
}
