pub mod philomena;
