//! Average and weighted sum

use crate::layout::declare::{Declaration, Relation};
use crate::layout::driver::Pass;
use crate::layout::error::LayoutError;
use crate::layout::expr::{Expression, Variable};

use super::{require_finite, require_nonempty};

impl Pass<'_> {
    /// Declare `mean(inputs) >= average`.
    ///
    /// The relation is one-sided: `average` is a lower bound of the mean,
    /// not pinned to it.
    pub fn average<E>(
        &mut self,
        inputs: impl IntoIterator<Item = E>,
        average: impl Into<Expression>,
    ) -> Result<(), LayoutError>
    where
        E: Into<Expression>,
    {
        let inputs: Vec<Expression> = inputs.into_iter().map(Into::into).collect();
        require_nonempty("average", "input list", &inputs)?;

        let weight = 1.0 / inputs.len() as f64;
        let mean = inputs
            .into_iter()
            .fold(Expression::default(), |acc, input| acc + input * weight);
        self.declare(Declaration::greater_or_equal(mean, average))?;
        Ok(())
    }

    /// Make every value proportional to its weight and relate their sum to
    /// `target`.
    ///
    /// A unit variable `u` is generated under `name`; each pair declares
    /// `w * u = value` and the sum declares `Σ w * u (relation) target`.
    pub fn weighted_sum(
        &mut self,
        name: &str,
        pairs: &[(Expression, f64)],
        relation: Relation,
        target: impl Into<Expression>,
    ) -> Result<Variable, LayoutError> {
        require_nonempty("weighted sum", "value list", pairs)?;
        for (_, weight) in pairs {
            require_finite("weighted sum", "weight", *weight)?;
        }
        let target = target.into();

        self.scope(name, |p| {
            let unit = p.variable("unit")?;
            for (value, weight) in pairs {
                p.declare(Declaration::equal(*weight * unit, value.clone()))?;
            }
            let total: f64 = pairs.iter().map(|(_, w)| w).sum();
            p.declare(Declaration::new(total * unit, relation, target))?;
            Ok(unit)
        })
    }
}
