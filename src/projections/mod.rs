//! Diagram projections

pub mod diagram;

pub use diagram::*;

/// Renders diagrams; implemented by the diagram widget
pub trait DiagramSurface: Send + Sync {
    /// Show `diagram`, replacing whatever was shown before
    fn render(&self, diagram: &Diagram);
}

impl<F> DiagramSurface for F
where
    F: Fn(&Diagram) + Send + Sync,
{
    fn render(&self, diagram: &Diagram) {
        self(diagram)
    }
}
