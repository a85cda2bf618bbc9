//! Built-in demo corpora
//!
//! Small fixed passage sets backing the wiki and msmarco data sources, so a
//! fresh checkout serves real pipeline responses without downloading an
//! index. A real corpus can replace the custom source via RANKSERVE_CORPUS.

use rankserve_core::corpus::{Corpus, CorpusDocument};

fn doc(id: &str, title: &str, text: &str) -> CorpusDocument {
    CorpusDocument {
        id: id.to_string(),
        title: title.to_string(),
        text: text.to_string(),
    }
}

/// Demo Wikipedia-style corpus.
pub fn wiki() -> Corpus {
    Corpus::new(
        "wiki",
        vec![
            doc(
                "1",
                "France",
                "The capital of France is Paris. Paris is the largest city in France and \
                 lies on the Seine river in the north of the country.",
            ),
            doc(
                "2",
                "Germany",
                "Berlin is the capital of Germany. Berlin is known for its history, museums \
                 and vibrant cultural scene.",
            ),
            doc(
                "3",
                "Spain",
                "Madrid is the capital of Spain and its largest city, located on the Manzanares \
                 river in the centre of the Iberian peninsula.",
            ),
            doc(
                "4",
                "Machine learning",
                "Machine learning is a field of artificial intelligence that studies algorithms \
                 able to learn patterns from data without being explicitly programmed.",
            ),
            doc(
                "5",
                "Information retrieval",
                "Information retrieval is the science of searching for information in documents. \
                 BM25 is a classic ranking function used by search engines to estimate the \
                 relevance of documents to a query.",
            ),
            doc(
                "6",
                "Reranking",
                "In search systems, reranking reorders an initial candidate list with a more \
                 expensive relevance model such as a cross-encoder, trading latency for \
                 ranking quality.",
            ),
            doc(
                "7",
                "Mount Everest",
                "Mount Everest is Earth's highest mountain above sea level, located in the \
                 Himalayas on the border between Nepal and China.",
            ),
            doc(
                "8",
                "Photosynthesis",
                "Photosynthesis is the process by which green plants convert sunlight, water \
                 and carbon dioxide into oxygen and glucose.",
            ),
        ],
    )
}

/// Demo MS MARCO-style passage corpus.
pub fn msmarco() -> Corpus {
    Corpus::new(
        "msmarco",
        vec![
            doc(
                "p1",
                "",
                "The Eiffel Tower is a wrought-iron lattice tower on the Champ de Mars in \
                 Paris, France, completed in 1889.",
            ),
            doc(
                "p2",
                "",
                "Aspirin is used to reduce fever and relieve mild to moderate pain from \
                 headaches, muscle aches and toothaches.",
            ),
            doc(
                "p3",
                "",
                "The Great Barrier Reef is the world's largest coral reef system, stretching \
                 over 2300 kilometres off the coast of Queensland, Australia.",
            ),
            doc(
                "p4",
                "",
                "A lunar eclipse occurs when the Moon moves into the Earth's shadow, which can \
                 happen only on the night of a full moon.",
            ),
            doc(
                "p5",
                "",
                "Python and Rust are popular programming languages; Rust emphasizes memory \
                 safety without garbage collection.",
            ),
        ],
    )
}
