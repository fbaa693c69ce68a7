pub mod alias_boost_scorer;
pub mod mapping_log_side_effect;
pub mod ranked_candidate_selector;
pub mod rationale_hydrator;
pub mod registry_match_source;
pub mod text_prep_query_hydrator;
pub mod weak_match_filter;
