mod binary;
mod claims;
mod schedule;
