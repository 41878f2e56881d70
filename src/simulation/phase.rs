/// One step of a simulation round, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Plates,
    Impacts,
    Erosion,
    Landslides,
    Diffusion,
    SeaLevel,
    Evaporation,
    Clouds,
    Precipitation,
    Hydrology,
    Rivers,
    Transport,
}

impl Phase {
    pub fn name(&self) -> &str {
        match self {
            Phase::Plates => "plates",
            Phase::Impacts => "impacts",
            Phase::Erosion => "erosion",
            Phase::Landslides => "landslides",
            Phase::Diffusion => "diffusion",
            Phase::SeaLevel => "sea_level",
            Phase::Evaporation => "evaporation",
            Phase::Clouds => "clouds",
            Phase::Precipitation => "precipitation",
            Phase::Hydrology => "hydrology",
            Phase::Rivers => "rivers",
            Phase::Transport => "transport",
        }
    }

    pub fn all() -> &'static [Phase] {
        &[
            Phase::Plates,
            Phase::Impacts,
            Phase::Erosion,
            Phase::Landslides,
            Phase::Diffusion,
            Phase::SeaLevel,
            Phase::Evaporation,
            Phase::Clouds,
            Phase::Precipitation,
            Phase::Hydrology,
            Phase::Rivers,
            Phase::Transport,
        ]
    }

    /// Phases skipped in the final round so the rivers and lakes match the
    /// emitted heights. Plates still move, ahead of the sea level pass.
    pub fn mutates_height(&self) -> bool {
        matches!(
            self,
            Phase::Impacts
                | Phase::Erosion
                | Phase::Landslides
                | Phase::Diffusion
                | Phase::Transport
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_unique() {
        let mut names: Vec<&str> = Phase::all().iter().map(|p| p.name()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), Phase::all().len());
    }

    #[test]
    fn routing_phases_never_mutate_height() {
        for phase in [Phase::SeaLevel, Phase::Hydrology, Phase::Rivers, Phase::Clouds] {
            assert!(!phase.mutates_height(), "{}", phase.name());
        }
        assert!(Phase::Transport.mutates_height());
    }
}
