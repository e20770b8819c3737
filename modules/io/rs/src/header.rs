use noodles::sam;
use noodles::sam::header::record::value::map::read_group::tag as rg_tag;

use sitewise_core_rs::strat::ReadGroupDecl;

/// Read groups declared in a SAM/BAM header, in header order.
pub fn read_groups(header: &sam::Header) -> Vec<ReadGroupDecl> {
    log::debug!("Found {} read group(s) in the header", header.read_groups().len());
    header
        .read_groups()
        .iter()
        .map(|(id, rg)| {
            let sample = rg
                .other_fields()
                .get(&rg_tag::SAMPLE)
                .map(|sm| sm.to_string());
            ReadGroupDecl::new(id.to_string(), sample)
        })
        .collect()
}
