//! Subject classification taxonomy
//!
//! A fixed snapshot of the arXiv category list, seeded into the store
//! before any paper so that category links always resolve. Papers
//! occasionally carry archive-level codes like "astro-ph" without a
//! subfield suffix, so a catch-all entry for it is included.

use super::Category;

fn cat(code: &str, title: &str, description: &str) -> Category {
    Category {
        code: code.to_string(),
        title: title.to_string(),
        description: description.to_string(),
    }
}

/// The categories seeded at the start of every ingestion run
pub fn taxonomy() -> Vec<Category> {
    vec![
        cat(
            "cs.AI",
            "Artificial Intelligence",
            "Covers all areas of AI except Vision, Robotics, Machine Learning, \
             Multiagent Systems, and Computation and Language.",
        ),
        cat(
            "cs.CL",
            "Computation and Language",
            "Covers natural language processing and computational linguistics.",
        ),
        cat(
            "cs.CV",
            "Computer Vision and Pattern Recognition",
            "Covers image processing, computer vision, pattern recognition, and \
             scene understanding.",
        ),
        cat(
            "cs.DB",
            "Databases",
            "Covers database management, datamining, and data processing.",
        ),
        cat(
            "cs.DC",
            "Distributed, Parallel, and Cluster Computing",
            "Covers fault-tolerance, distributed algorithms, parallelism, and \
             cluster computing.",
        ),
        cat(
            "cs.DS",
            "Data Structures and Algorithms",
            "Covers data structures and analysis of algorithms.",
        ),
        cat(
            "cs.IR",
            "Information Retrieval",
            "Covers indexing, dictionaries, retrieval, content and analysis.",
        ),
        cat(
            "cs.IT",
            "Information Theory",
            "Covers theoretical and experimental aspects of information theory \
             and coding.",
        ),
        cat(
            "cs.LG",
            "Machine Learning",
            "Papers on all aspects of machine learning research.",
        ),
        cat(
            "cs.NE",
            "Neural and Evolutionary Computing",
            "Covers neural networks, connectionism, genetic algorithms, and \
             artificial life.",
        ),
        cat(
            "cs.RO",
            "Robotics",
            "Roughly includes material in ACM Subject Class I.2.9.",
        ),
        cat(
            "cs.SE",
            "Software Engineering",
            "Covers design tools, software metrics, testing and debugging, and \
             programming environments.",
        ),
        cat(
            "stat.ML",
            "Machine Learning (Statistics)",
            "Machine learning papers with a statistical or theoretical grounding.",
        ),
        cat(
            "stat.ME",
            "Methodology",
            "Design, surveys, model selection, multiple testing, and multivariate \
             methods.",
        ),
        cat(
            "math.OC",
            "Optimization and Control",
            "Operations research, linear programming, control theory, and \
             optimization.",
        ),
        cat(
            "math.ST",
            "Statistics Theory",
            "Applied, computational and theoretical statistics.",
        ),
        cat(
            "math.PR",
            "Probability",
            "Theory and applications of probability.",
        ),
        cat(
            "math.NA",
            "Numerical Analysis",
            "Numerical algorithms for problems in analysis and algebra.",
        ),
        cat(
            "eess.AS",
            "Audio and Speech Processing",
            "Theory and methods for processing audio and speech signals.",
        ),
        cat(
            "eess.IV",
            "Image and Video Processing",
            "Theory and methods for image and video acquisition, processing, and \
             analysis.",
        ),
        cat(
            "eess.SP",
            "Signal Processing",
            "Theory and methods for signal processing.",
        ),
        cat(
            "astro-ph.CO",
            "Cosmology and Nongalactic Astrophysics",
            "Phenomenology of early universe, cosmic microwave background, and \
             large-scale structure.",
        ),
        cat(
            "astro-ph.GA",
            "Astrophysics of Galaxies",
            "Phenomena pertaining to galaxies or the Milky Way.",
        ),
        cat(
            "astro-ph.IM",
            "Instrumentation and Methods for Astrophysics",
            "Detector and telescope design, laboratory astrophysics, and methods \
             for data analysis.",
        ),
        cat(
            "astro-ph.SR",
            "Solar and Stellar Astrophysics",
            "White dwarfs, brown dwarfs, stellar structure, and the Sun.",
        ),
        cat(
            "quant-ph",
            "Quantum Physics",
            "Quantum information, foundations, and quantum technologies.",
        ),
        cat(
            "cond-mat.stat-mech",
            "Statistical Mechanics",
            "Phase transitions, thermodynamics, field theory, and non-equilibrium \
             phenomena.",
        ),
        // legacy archive-level code still seen on older papers
        cat("astro-ph", "General Astrophysics", "General Astrophysics"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_codes_are_unique() {
        let cats = taxonomy();
        let codes: HashSet<_> = cats.iter().map(|c| c.code.as_str()).collect();
        assert_eq!(codes.len(), cats.len());
    }

    #[test]
    fn test_catch_all_present() {
        let cats = taxonomy();
        let astro = cats.iter().find(|c| c.code == "astro-ph");
        assert!(astro.is_some());
        assert_eq!(astro.unwrap().title, "General Astrophysics");
    }

    #[test]
    fn test_no_empty_fields() {
        for c in taxonomy() {
            assert!(!c.code.is_empty());
            assert!(!c.title.is_empty());
            assert!(!c.description.is_empty());
        }
    }
}
